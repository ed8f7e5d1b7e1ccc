use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::event::{BookingPayload, EventError, TriggerEvent, WebhookEvent};
use super::signature::SignatureVerifier;
use crate::bookings::{
    Account, AccountDirectory, BookingStatus, BookingStore, NewBooking, Reschedule,
};
use crate::notify::{Notifier, Recipient};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid webhook signature")]
    Unauthorized,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("persistence failure: {0:#}")]
    PersistenceFailure(anyhow::Error),
}

impl From<EventError> for ReconcileError {
    fn from(err: EventError) -> Self {
        ReconcileError::MalformedPayload(err.to_string())
    }
}

/// What happened to an event that was accepted. Every variant is
/// acknowledged to the sender.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created { external_booking_id: String },
    /// Redelivered creation, the booking is already stored
    AlreadyApplied { external_booking_id: String },
    Rescheduled { external_booking_id: String },
    Cancelled { external_booking_id: String },
    /// Follow up event for a booking that isn't stored (yet)
    UnknownBooking { external_booking_id: String },
    RecipientNotFound { email: Option<String> },
    Unhandled { trigger_event: String },
}

/// Applies booking lifecycle events from the scheduling provider to
/// the local booking records.
pub struct Reconciler {
    verifier: SignatureVerifier,
    accounts: Arc<dyn AccountDirectory>,
    bookings: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
    clock: Clock,
}

impl Reconciler {
    pub fn new(
        verifier: SignatureVerifier,
        accounts: Arc<dyn AccountDirectory>,
        bookings: Arc<dyn BookingStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            verifier,
            accounts,
            bookings,
            notifier,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the source of `created_at`/`updated_at` stamps
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Authenticate, parse and apply one webhook delivery.
    ///
    /// Each event is applied independently and keyed by the external
    /// booking id, so duplicate and out of order deliveries are
    /// acknowledged without creating extra records.
    pub async fn handle_event(
        &self,
        raw_payload: &[u8],
        signature: Option<&str>,
    ) -> Result<Outcome, ReconcileError> {
        let authentic = signature.is_some_and(|sig| self.verifier.verify(raw_payload, sig));
        if !authentic {
            tracing::warn!("Rejected webhook with invalid signature");
            return Err(ReconcileError::Unauthorized);
        }

        let event = WebhookEvent::parse(raw_payload)?;
        tracing::info!("Webhook received: {}", event.trigger_event.as_str());

        // Other event kinds may not carry a booking at all
        if let TriggerEvent::Other(_) = &event.trigger_event {
            return Ok(self.unhandled(&event.trigger_event));
        }
        let booking = event.booking()?;

        let Some(email) = booking.attendee_email() else {
            tracing::warn!("Webhook has no attendee email, booking not stored");
            return Ok(Outcome::RecipientNotFound { email: None });
        };
        let account = self
            .accounts
            .find_by_email(email)
            .await
            .map_err(ReconcileError::PersistenceFailure)?;
        let Some(account) = account else {
            tracing::warn!("User not found: {}", email);
            return Ok(Outcome::RecipientNotFound {
                email: Some(email.to_string()),
            });
        };

        match &event.trigger_event {
            TriggerEvent::BookingCreated => self.created(&booking, &event.payload, account).await,
            TriggerEvent::BookingRescheduled => self.rescheduled(&booking, &event.payload).await,
            TriggerEvent::BookingCancelled => self.cancelled(&booking).await,
            TriggerEvent::Other(_) => Ok(self.unhandled(&event.trigger_event)),
        }
    }

    fn unhandled(&self, trigger_event: &TriggerEvent) -> Outcome {
        tracing::info!("Unhandled event type: {}", trigger_event.as_str());
        Outcome::Unhandled {
            trigger_event: trigger_event.as_str().to_string(),
        }
    }

    async fn created(
        &self,
        booking: &BookingPayload,
        raw: &serde_json::Value,
        account: Account,
    ) -> Result<Outcome, ReconcileError> {
        let external_booking_id = booking.uid()?.to_string();
        let (start_time, end_time) = booking.window()?;
        let status = booking.status()?.unwrap_or(BookingStatus::Accepted);
        let now = (self.clock)();

        let record = NewBooking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: account.id.clone(),
            external_booking_id: external_booking_id.clone(),
            event_type_id: booking.event_type_id(),
            title: booking.title.clone(),
            description: booking.description.clone(),
            start_time,
            end_time,
            attendee_name: booking.attendee_name().map(str::to_string),
            attendee_email: booking.attendee_email().map(str::to_string),
            attendee_timezone: booking.attendee_timezone().map(str::to_string),
            status,
            metadata: raw.clone(),
            created_at: now,
            updated_at: now,
        };

        let inserted = self.bookings.insert_if_absent(record).await.map_err(|err| {
            tracing::error!("Error creating booking {}: {:#}", external_booking_id, err);
            ReconcileError::PersistenceFailure(err)
        })?;
        if !inserted {
            tracing::info!("Booking {} already stored, skipping", external_booking_id);
            return Ok(Outcome::AlreadyApplied {
                external_booking_id,
            });
        }

        let recipient = Recipient {
            id: account.id,
            email: booking.attendee_email().map(str::to_string),
            name: booking
                .attendee_name()
                .map(str::to_string)
                .or(account.full_name),
        };
        self.dispatch_confirmation(recipient);

        tracing::info!("Booking created successfully: {}", external_booking_id);
        Ok(Outcome::Created {
            external_booking_id,
        })
    }

    // The stored booking is the source of truth. A failed notification
    // is logged and never fails the request or undoes the insert.
    fn dispatch_confirmation(&self, recipient: Recipient) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(err) = notifier.booking_confirmed(&recipient).await {
                tracing::error!(
                    "Failed to notify {} about their booking: {:#}",
                    recipient.id,
                    err
                );
            }
        });
    }

    async fn rescheduled(
        &self,
        booking: &BookingPayload,
        raw: &serde_json::Value,
    ) -> Result<Outcome, ReconcileError> {
        let external_booking_id = booking.correlation_id()?.to_string();
        let (start_time, end_time) = booking.window()?;
        let change = Reschedule {
            start_time,
            end_time,
            status: booking.status()?,
            metadata: raw.clone(),
            updated_at: (self.clock)(),
        };

        let found = self
            .bookings
            .reschedule(&external_booking_id, change)
            .await
            .map_err(|err| {
                tracing::error!(
                    "Error rescheduling booking {}: {:#}",
                    external_booking_id,
                    err
                );
                ReconcileError::PersistenceFailure(err)
            })?;
        if !found {
            tracing::warn!("Reschedule for unknown booking {}", external_booking_id);
            return Ok(Outcome::UnknownBooking {
                external_booking_id,
            });
        }

        tracing::info!("Booking rescheduled successfully: {}", external_booking_id);
        Ok(Outcome::Rescheduled {
            external_booking_id,
        })
    }

    async fn cancelled(&self, booking: &BookingPayload) -> Result<Outcome, ReconcileError> {
        let external_booking_id = booking.correlation_id()?.to_string();

        let found = self
            .bookings
            .cancel(&external_booking_id, (self.clock)())
            .await
            .map_err(|err| {
                tracing::error!(
                    "Error cancelling booking {}: {:#}",
                    external_booking_id,
                    err
                );
                ReconcileError::PersistenceFailure(err)
            })?;
        if !found {
            tracing::warn!("Cancellation for unknown booking {}", external_booking_id);
            return Ok(Outcome::UnknownBooking {
                external_booking_id,
            });
        }

        tracing::info!("Booking cancelled successfully: {}", external_booking_id);
        Ok(Outcome::Cancelled {
            external_booking_id,
        })
    }
}
