//! Reconciling Cal.com booking webhooks with local booking records

pub mod event;
pub mod reconciler;
pub mod signature;

pub use event::{BookingPayload, EventError, TriggerEvent, WebhookEvent};
pub use reconciler::{Clock, Outcome, ReconcileError, Reconciler};
pub use signature::{SIGNATURE_HEADER, SignatureVerifier};
