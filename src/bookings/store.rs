use anyhow::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{Account, Booking, NewBooking, Reschedule};

/// Read access to the accounts that can own bookings.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error>;
}

/// Persistence for booking records, keyed by the scheduling
/// provider's booking id.
///
/// Every mutation is a single row insert-if-absent or update-by-key
/// so concurrent deliveries for the same booking only rely on the
/// store's per row atomicity.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Returns `false` when a booking with the same external id
    /// already exists. Nothing is written in that case.
    async fn insert_if_absent(&self, booking: NewBooking) -> Result<bool, Error>;

    /// Returns `false` when there is no booking with that external id.
    async fn reschedule(&self, external_booking_id: &str, change: Reschedule)
    -> Result<bool, Error>;

    /// Returns `false` when there is no booking with that external id.
    async fn cancel(&self, external_booking_id: &str, updated_at: DateTime<Utc>)
    -> Result<bool, Error>;

    async fn find_by_external_id(&self, external_booking_id: &str)
    -> Result<Option<Booking>, Error>;

    /// All bookings for the user ordered by start time, earliest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, Error>;
}
