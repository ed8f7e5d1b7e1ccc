pub mod api;
pub mod bookings;
pub mod cli;
pub mod core;
pub mod notify;
pub mod webhook;
