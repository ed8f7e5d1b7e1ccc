//! Public types for the webhook API
use serde::{Deserialize, Serialize};

use crate::webhook::Outcome;

/// Body of every successfully processed delivery
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Acknowledgement {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Outcome> for Acknowledgement {
    fn from(outcome: &Outcome) -> Self {
        let message = match outcome {
            Outcome::Created { .. } | Outcome::Rescheduled { .. } | Outcome::Cancelled { .. } => {
                None
            }
            Outcome::AlreadyApplied { .. } => Some("Booking already stored"),
            Outcome::UnknownBooking { .. } => Some("Booking not found, nothing updated"),
            Outcome::RecipientNotFound { .. } => Some("User not found, booking not stored"),
            Outcome::Unhandled { .. } => Some("Unhandled event type"),
        };
        Self {
            received: true,
            message: message.map(str::to_string),
        }
    }
}

/// Body of a rejected or failed delivery
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
