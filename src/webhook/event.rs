//! Booking lifecycle events as delivered by Cal.com

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::bookings::{BookingStatus, UnknownStatus, parse_timestamp};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid timestamp in {field}: {source}")]
    InvalidTimestamp {
        field: &'static str,
        source: chrono::ParseError,
    },
    #[error("endTime is before startTime")]
    InvertedWindow,
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "String")]
pub enum TriggerEvent {
    BookingCreated,
    BookingRescheduled,
    BookingCancelled,
    /// Anything this service doesn't act on (PING, MEETING_ENDED, ...)
    Other(String),
}

impl From<String> for TriggerEvent {
    fn from(s: String) -> Self {
        match s.as_str() {
            "BOOKING_CREATED" => TriggerEvent::BookingCreated,
            "BOOKING_RESCHEDULED" => TriggerEvent::BookingRescheduled,
            "BOOKING_CANCELLED" => TriggerEvent::BookingCancelled,
            _ => TriggerEvent::Other(s),
        }
    }
}

impl TriggerEvent {
    pub fn as_str(&self) -> &str {
        match self {
            TriggerEvent::BookingCreated => "BOOKING_CREATED",
            TriggerEvent::BookingRescheduled => "BOOKING_RESCHEDULED",
            TriggerEvent::BookingCancelled => "BOOKING_CANCELLED",
            TriggerEvent::Other(s) => s,
        }
    }
}

/// Outer envelope of every webhook delivery
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "triggerEvent")]
    pub trigger_event: TriggerEvent,
    #[serde(default)]
    pub payload: Value,
}

impl WebhookEvent {
    pub fn parse(raw: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// The booking details carried by the event. Event kinds this
    /// service ignores may not have a booking shaped payload at all.
    pub fn booking(&self) -> Result<BookingPayload, EventError> {
        Ok(BookingPayload::deserialize(&self.payload)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attendee {
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "timeZone")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub uid: Option<String>,
    #[serde(rename = "iCalUID")]
    pub ical_uid: Option<String>,
    // Sent as a number, stored as text
    pub event_type_id: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<String>,
    pub attendees: Option<Vec<Attendee>>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl BookingPayload {
    pub fn primary_attendee(&self) -> Option<&Attendee> {
        self.attendees.as_ref().and_then(|a| a.first())
    }

    pub fn attendee_email(&self) -> Option<&str> {
        non_empty(self.primary_attendee().and_then(|a| a.email.as_deref()))
    }

    pub fn attendee_name(&self) -> Option<&str> {
        non_empty(self.primary_attendee().and_then(|a| a.name.as_deref()))
    }

    pub fn attendee_timezone(&self) -> Option<&str> {
        non_empty(self.primary_attendee().and_then(|a| a.time_zone.as_deref()))
    }

    /// External booking id of a newly created booking
    pub fn uid(&self) -> Result<&str, EventError> {
        non_empty(self.uid.as_deref()).ok_or(EventError::MissingField("uid"))
    }

    /// External booking id for follow up events. Cal.com sets the
    /// iCal UID to `<booking uid>@<domain>` and keeps it stable
    /// across reschedules, unlike `uid`.
    pub fn correlation_id(&self) -> Result<&str, EventError> {
        non_empty(self.ical_uid.as_deref())
            .and_then(|ical| non_empty(ical.split('@').next()))
            .ok_or(EventError::MissingField("iCalUID"))
    }

    pub fn event_type_id(&self) -> Option<String> {
        match &self.event_type_id {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) => non_empty(Some(s.as_str())).map(str::to_string),
            _ => None,
        }
    }

    pub fn window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), EventError> {
        let parse = |field: &'static str, value: Option<&str>| {
            let value = non_empty(value).ok_or(EventError::MissingField(field))?;
            parse_timestamp(value).map_err(|source| EventError::InvalidTimestamp { field, source })
        };
        let start = parse("startTime", self.start_time.as_deref())?;
        let end = parse("endTime", self.end_time.as_deref())?;
        if end < start {
            return Err(EventError::InvertedWindow);
        }
        Ok((start, end))
    }

    pub fn status(&self) -> Result<Option<BookingStatus>, EventError> {
        non_empty(self.status.as_deref())
            .map(|s| s.parse::<BookingStatus>())
            .transpose()
            .map_err(EventError::from)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(value: Value) -> WebhookEvent {
        WebhookEvent::parse(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn it_parses_a_created_event() {
        let event = event(json!({
            "triggerEvent": "BOOKING_CREATED",
            "payload": {
                "uid": "abc123",
                "eventTypeId": 5,
                "title": "Yoga",
                "startTime": "2025-01-01T10:00:00Z",
                "endTime": "2025-01-01T11:00:00Z",
                "status": "ACCEPTED",
                "attendees": [{"email": "a@x.com", "name": "A", "timeZone": "UTC"}]
            }
        }));
        assert_eq!(event.trigger_event, TriggerEvent::BookingCreated);

        let booking = event.booking().unwrap();
        assert_eq!(booking.uid().unwrap(), "abc123");
        assert_eq!(booking.event_type_id().as_deref(), Some("5"));
        assert_eq!(booking.attendee_email(), Some("a@x.com"));
        assert_eq!(booking.attendee_name(), Some("A"));
        assert_eq!(booking.attendee_timezone(), Some("UTC"));
        assert_eq!(booking.status().unwrap(), Some(BookingStatus::Accepted));

        let (start, end) = booking.window().unwrap();
        assert_eq!((end - start).num_minutes(), 60);
    }

    #[test]
    fn it_keeps_unknown_trigger_events() {
        let event = event(json!({"triggerEvent": "MEETING_ENDED", "payload": {}}));
        assert_eq!(
            event.trigger_event,
            TriggerEvent::Other("MEETING_ENDED".to_string())
        );
        assert_eq!(event.trigger_event.as_str(), "MEETING_ENDED");
    }

    #[test]
    fn it_rejects_bodies_without_a_trigger_event() {
        assert!(WebhookEvent::parse(b"{\"payload\": {}}").is_err());
        assert!(WebhookEvent::parse(b"not json").is_err());
        assert!(WebhookEvent::parse(b"").is_err());
    }

    #[test]
    fn it_derives_the_correlation_id_from_the_ical_uid() {
        let booking = event(json!({
            "triggerEvent": "BOOKING_CANCELLED",
            "payload": {"uid": "new-uid", "iCalUID": "abc123@Cal.com"}
        }))
        .booking()
        .unwrap();
        assert_eq!(booking.correlation_id().unwrap(), "abc123");

        let no_domain = event(json!({
            "triggerEvent": "BOOKING_CANCELLED",
            "payload": {"iCalUID": "abc123"}
        }))
        .booking()
        .unwrap();
        assert_eq!(no_domain.correlation_id().unwrap(), "abc123");
    }

    #[test]
    fn it_requires_a_usable_ical_uid() {
        for payload in [json!({}), json!({"iCalUID": ""}), json!({"iCalUID": "@Cal.com"})] {
            let booking = event(json!({"triggerEvent": "BOOKING_CANCELLED", "payload": payload}))
                .booking()
                .unwrap();
            assert!(matches!(
                booking.correlation_id(),
                Err(EventError::MissingField("iCalUID"))
            ));
        }
    }

    #[test]
    fn it_validates_the_time_window() {
        let booking = |start: &str, end: &str| {
            event(json!({
                "triggerEvent": "BOOKING_RESCHEDULED",
                "payload": {"startTime": start, "endTime": end}
            }))
            .booking()
            .unwrap()
        };
        assert!(matches!(
            booking("yesterday", "2025-01-01T11:00:00Z").window(),
            Err(EventError::InvalidTimestamp { field: "startTime", .. })
        ));
        assert!(matches!(
            booking("2025-01-01T11:00:00Z", "2025-01-01T10:00:00Z").window(),
            Err(EventError::InvertedWindow)
        ));
        assert!(matches!(
            booking("2025-01-01T10:00:00Z", "").window(),
            Err(EventError::MissingField("endTime"))
        ));
    }

    #[test]
    fn it_handles_missing_or_null_attendees() {
        let booking = event(json!({
            "triggerEvent": "BOOKING_CREATED",
            "payload": {"attendees": null, "description": null}
        }))
        .booking()
        .unwrap();
        assert!(booking.attendee_email().is_none());

        let blank = event(json!({
            "triggerEvent": "BOOKING_CREATED",
            "payload": {"attendees": [{"email": "  "}]}
        }))
        .booking()
        .unwrap();
        assert!(blank.attendee_email().is_none());
    }

    #[test]
    fn it_rejects_unknown_statuses() {
        let booking = event(json!({
            "triggerEvent": "BOOKING_CREATED",
            "payload": {"status": "TENTATIVE"}
        }))
        .booking()
        .unwrap();
        assert!(matches!(booking.status(), Err(EventError::UnknownStatus(_))));
    }

    #[test]
    fn it_fails_on_a_payload_that_is_not_an_object() {
        let event = event(json!({"triggerEvent": "PING", "payload": "hello"}));
        assert!(event.booking().is_err());
    }
}
