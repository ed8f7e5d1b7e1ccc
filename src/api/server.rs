use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::api::state::AppState;
use crate::bookings::open_stores;
use crate::core::AppConfig;
use crate::notify::KnockNotifier;
use crate::webhook::{Reconciler, SignatureVerifier};

pub fn app(shared_state: Arc<AppState>) -> Router {
    Router::new()
        // API routes
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Wire the reconciler up to the configured database and
/// notification provider.
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let stores = open_stores(&config.database)
        .await
        .context("Failed to connect to the booking database")?;
    let notifier = KnockNotifier::new(
        &config.knock_api_url,
        &config.knock_api_key,
        &config.knock_workflow_key,
    )
    .context("Failed to build the notification client")?;
    let reconciler = Reconciler::new(
        SignatureVerifier::new(&config.webhook_secret),
        stores.accounts,
        stores.bookings,
        Arc::new(notifier),
    );
    Ok(AppState::new(reconciler))
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    let app_state = build_state(&config).await?;
    let app = app(Arc::new(app_state));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    tracing::debug!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
