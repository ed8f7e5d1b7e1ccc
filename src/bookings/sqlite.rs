use anyhow::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params, types::Type};
use tokio_rusqlite::Connection;

use super::models::{
    Account, Booking, NewBooking, Reschedule, format_timestamp, parse_timestamp,
};
use super::store::{AccountDirectory, BookingStore};

const BOOKING_COLUMNS: &str = "id, user_id, external_booking_id, event_type_id, title, \
     description, start_time, end_time, attendee_name, attendee_email, attendee_timezone, \
     status, metadata, created_at, updated_at";

/// Booking and profile storage backed by a local SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    db: Connection,
}

impl SqliteStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    /// Add a profile so events for `email` resolve to it. Profiles
    /// normally come from the identity provider, this is for local
    /// setups and tests.
    pub async fn register_account(&self, account: Account) -> Result<(), Error> {
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO profile (id, email, full_name) VALUES (?, ?, ?)",
                    params![account.id, account.email.trim(), account.full_name],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let val: String = row.get(idx)?;
    parse_timestamp(&val)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn booking_from_row(row: &Row) -> rusqlite::Result<Booking> {
    let metadata: String = row.get(12)?;
    let metadata = serde_json::from_str(&metadata)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e)))?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        external_booking_id: row.get(2)?,
        event_type_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        start_time: timestamp_column(row, 6)?,
        end_time: timestamp_column(row, 7)?,
        attendee_name: row.get(8)?,
        attendee_email: row.get(9)?,
        attendee_timezone: row.get(10)?,
        status: row.get(11)?,
        metadata,
        created_at: timestamp_column(row, 13)?,
        updated_at: timestamp_column(row, 14)?,
    })
}

#[async_trait]
impl AccountDirectory for SqliteStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let email = email.trim().to_owned();
        let account = self
            .db
            .call(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT id, email, full_name FROM profile WHERE email = ?",
                        [email],
                        |row| {
                            Ok(Account {
                                id: row.get(0)?,
                                email: row.get(1)?,
                                full_name: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(result)
            })
            .await?;
        Ok(account)
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn insert_if_absent(&self, booking: NewBooking) -> Result<bool, Error> {
        let metadata = booking.metadata.to_string();
        let inserted = self
            .db
            .call(move |conn| {
                let changed = conn.execute(
                    &format!(
                        "INSERT INTO booking ({})
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                         ON CONFLICT(external_booking_id) DO NOTHING",
                        BOOKING_COLUMNS
                    ),
                    params![
                        booking.id,
                        booking.user_id,
                        booking.external_booking_id,
                        booking.event_type_id,
                        booking.title,
                        booking.description,
                        format_timestamp(&booking.start_time),
                        format_timestamp(&booking.end_time),
                        booking.attendee_name,
                        booking.attendee_email,
                        booking.attendee_timezone,
                        booking.status,
                        metadata,
                        format_timestamp(&booking.created_at),
                        format_timestamp(&booking.updated_at),
                    ],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(inserted == 1)
    }

    async fn reschedule(
        &self,
        external_booking_id: &str,
        change: Reschedule,
    ) -> Result<bool, Error> {
        let ext_id = external_booking_id.to_owned();
        let metadata = change.metadata.to_string();
        let changed = self
            .db
            .call(move |conn| {
                // A reschedule without a status keeps the stored one
                let changed = conn.execute(
                    "UPDATE booking
                     SET start_time = ?, end_time = ?, status = COALESCE(?, status),
                         metadata = ?, updated_at = ?
                     WHERE external_booking_id = ?",
                    params![
                        format_timestamp(&change.start_time),
                        format_timestamp(&change.end_time),
                        change.status,
                        metadata,
                        format_timestamp(&change.updated_at),
                        ext_id,
                    ],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    async fn cancel(
        &self,
        external_booking_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let ext_id = external_booking_id.to_owned();
        let changed = self
            .db
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE booking SET status = 'CANCELLED', updated_at = ?
                     WHERE external_booking_id = ?",
                    params![format_timestamp(&updated_at), ext_id],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    async fn find_by_external_id(
        &self,
        external_booking_id: &str,
    ) -> Result<Option<Booking>, Error> {
        let ext_id = external_booking_id.to_owned();
        let booking = self
            .db
            .call(move |conn| {
                let result = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM booking WHERE external_booking_id = ?",
                            BOOKING_COLUMNS
                        ),
                        [ext_id],
                        booking_from_row,
                    )
                    .optional()?;
                Ok(result)
            })
            .await?;
        Ok(booking)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, Error> {
        let user_id = user_id.to_owned();
        let bookings = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM booking WHERE user_id = ? ORDER BY start_time ASC",
                    BOOKING_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([user_id], booking_from_row)?
                    .collect::<Result<Vec<Booking>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(bookings)
    }
}
