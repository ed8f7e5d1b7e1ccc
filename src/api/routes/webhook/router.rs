//! Router for the webhook API

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::public::{Acknowledgement, ErrorResponse};
use crate::api::state::AppState;
use crate::webhook::{ReconcileError, SIGNATURE_HEADER};

type SharedState = Arc<AppState>;

/// Anything past the signature check that stops an event from being
/// applied is a processing failure.
impl IntoResponse for ReconcileError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ReconcileError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid signature"),
            ReconcileError::MalformedPayload(reason) => {
                tracing::warn!("Malformed webhook payload: {}", reason);
                (StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed")
            }
            ReconcileError::PersistenceFailure(err) => {
                tracing::error!("Webhook error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed")
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        )
            .into_response()
    }
}

/// Handle booking lifecycle events from Cal.com. The body is taken as
/// raw bytes because the signature covers exactly what was sent.
async fn cal_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Acknowledgement>, ReconcileError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = state.reconciler.handle_event(&body, signature).await?;
    tracing::debug!("Webhook outcome: {:?}", outcome);
    Ok(Json(Acknowledgement::from(&outcome)))
}

/// Create the webhook router
pub fn router() -> Router<SharedState> {
    Router::new().route("/cal", axum::routing::post(cal_webhook))
}
