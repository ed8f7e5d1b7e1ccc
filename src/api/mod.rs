pub mod routes;
mod server;
pub use server::{app, build_state, serve};
pub mod public;
mod state;
pub use state::AppState;
