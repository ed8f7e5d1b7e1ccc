//! Booking storage on a hosted Postgres exposed through PostgREST.
//!
//! Requests authenticate with the service key, which bypasses row
//! level security, so this must only ever run server side.

use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::IgnoredAny;

use super::models::{Account, Booking, BookingStatus, NewBooking, Reschedule};
use super::store::{AccountDirectory, BookingStore};

const PROFILES_TABLE: &str = "profiles";
const BOOKINGS_TABLE: &str = "bookings";

#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    service_key: String,
}

#[derive(Serialize)]
struct BookingPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a serde_json::Value>,
    updated_at: DateTime<Utc>,
}

impl RestStore {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn patch_booking(
        &self,
        external_booking_id: &str,
        patch: &BookingPatch<'_>,
    ) -> Result<bool, Error> {
        let res = self
            .request(Method::PATCH, BOOKINGS_TABLE)
            .query(&[
                ("external_booking_id", format!("eq.{}", external_booking_id)),
                ("select", "id".to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        let rows: Vec<IgnoredAny> = error_for_status(res).await?.json().await?;
        Ok(!rows.is_empty())
    }
}

async fn error_for_status(res: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(anyhow!("Database request failed with {}: {}", status, body))
}

#[async_trait]
impl AccountDirectory for RestStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let res = self
            .request(Method::GET, PROFILES_TABLE)
            .query(&[
                ("select", "id,email,full_name".to_string()),
                ("email", format!("eq.{}", email.trim())),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let accounts: Vec<Account> = error_for_status(res).await?.json().await?;
        Ok(accounts.into_iter().next())
    }
}

#[async_trait]
impl BookingStore for RestStore {
    async fn insert_if_absent(&self, booking: NewBooking) -> Result<bool, Error> {
        let res = self
            .request(Method::POST, BOOKINGS_TABLE)
            .query(&[("on_conflict", "external_booking_id"), ("select", "id")])
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&booking)
            .send()
            .await?;

        // Without the unique index PostgREST reports the duplicate as
        // a conflict instead of ignoring it
        if res.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        let rows: Vec<IgnoredAny> = error_for_status(res).await?.json().await?;
        Ok(!rows.is_empty())
    }

    async fn reschedule(
        &self,
        external_booking_id: &str,
        change: Reschedule,
    ) -> Result<bool, Error> {
        let patch = BookingPatch {
            start_time: Some(change.start_time),
            end_time: Some(change.end_time),
            status: change.status,
            metadata: Some(&change.metadata),
            updated_at: change.updated_at,
        };
        self.patch_booking(external_booking_id, &patch).await
    }

    async fn cancel(
        &self,
        external_booking_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let patch = BookingPatch {
            start_time: None,
            end_time: None,
            status: Some(BookingStatus::Cancelled),
            metadata: None,
            updated_at,
        };
        self.patch_booking(external_booking_id, &patch).await
    }

    async fn find_by_external_id(
        &self,
        external_booking_id: &str,
    ) -> Result<Option<Booking>, Error> {
        let res = self
            .request(Method::GET, BOOKINGS_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("external_booking_id", format!("eq.{}", external_booking_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let bookings: Vec<Booking> = error_for_status(res).await?.json().await?;
        Ok(bookings.into_iter().next())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, Error> {
        let res = self
            .request(Method::GET, BOOKINGS_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "start_time.asc".to_string()),
            ])
            .send()
            .await?;
        let bookings: Vec<Booking> = error_for_status(res).await?.json().await?;
        Ok(bookings)
    }
}
