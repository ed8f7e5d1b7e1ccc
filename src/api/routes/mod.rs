//! API routes module

pub mod webhook;

use std::sync::Arc;

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<AppState>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Webhook routes
        .nest("/webhooks", webhook::router())
}
