use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a booking, mirrored from the scheduling
/// provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Accepted,
    Pending,
    Cancelled,
    Rejected,
    AwaitingHost,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Pending => "PENDING",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::AwaitingHost => "AWAITING_HOST",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown booking status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    // Cal.com sends upper case but older payloads and the API use
    // lower case, so accept either.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACCEPTED" => Ok(BookingStatus::Accepted),
            "PENDING" => Ok(BookingStatus::Pending),
            "CANCELLED" | "CANCELED" => Ok(BookingStatus::Cancelled),
            "REJECTED" => Ok(BookingStatus::Rejected),
            "AWAITING_HOST" => Ok(BookingStatus::AwaitingHost),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl ToSql for BookingStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for BookingStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A booking as stored locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub external_booking_id: String,
    pub event_type_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<String>,
    pub attendee_timezone: Option<String>,
    pub status: BookingStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Length of the session in whole minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Everything needed to insert a booking from a creation event. The
/// local `id` is assigned when the record is built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewBooking {
    pub id: String,
    pub user_id: String,
    pub external_booking_id: String,
    pub event_type_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<String>,
    pub attendee_timezone: Option<String>,
    pub status: BookingStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New time window (and optionally status) for an existing booking.
#[derive(Clone, Debug, PartialEq)]
pub struct Reschedule {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: Option<BookingStatus>,
    pub metadata: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// A local profile, owned by the identity provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// Fixed width RFC 3339 so stored timestamps sort as text.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}
