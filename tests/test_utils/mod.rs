//! Test utilities for integration tests
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::Request,
};
use tempfile::TempDir;

use bookings::api::{app, build_state};
use bookings::bookings::{Account, SqliteStore};
use bookings::core::db::async_db;
use bookings::core::{AppConfig, DatabaseConfig};
use bookings::webhook::{SIGNATURE_HEADER, SignatureVerifier};

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const USER_ID: &str = "u1";
pub const USER_EMAIL: &str = "a@x.com";

pub struct TestApp {
    pub router: Router,
    /// Second connection to the same database for assertions
    pub store: SqliteStore,
    // Deleted on drop
    _dir: TempDir,
}

/// Creates a test application backed by a fresh SQLite database in a
/// temporary directory, with one registered account and notifications
/// sent to `knock_url`.
pub async fn test_app(knock_url: &str) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("bookings.db");
    let db_path = db_path.to_str().unwrap().to_string();

    let config = AppConfig {
        database: DatabaseConfig::Sqlite {
            path: db_path.clone(),
        },
        webhook_secret: WEBHOOK_SECRET.to_string(),
        knock_api_key: String::from("sk_test"),
        knock_api_url: knock_url.to_string(),
        knock_workflow_key: String::from("booking-confirmed"),
    };
    let app_state = build_state(&config)
        .await
        .expect("Failed to build app state");

    let store = SqliteStore::new(
        async_db(&db_path)
            .await
            .expect("Failed to connect to async db"),
    );
    store
        .register_account(Account {
            id: USER_ID.to_string(),
            email: USER_EMAIL.to_string(),
            full_name: Some(String::from("Ada")),
        })
        .await
        .expect("Failed to register account");

    TestApp {
        router: app(Arc::new(app_state)),
        store,
        _dir: dir,
    }
}

/// A booking lifecycle event the way the scheduling provider sends it
pub fn booking_event(
    trigger_event: &str,
    uid: &str,
    ical_uid: &str,
    start_time: &str,
    end_time: &str,
    email: &str,
) -> String {
    serde_json::json!({
        "triggerEvent": trigger_event,
        "createdAt": "2030-01-01T00:00:00.000Z",
        "payload": {
            "uid": uid,
            "iCalUID": format!("{}@Cal.com", ical_uid),
            "eventTypeId": 42,
            "title": "Intro call",
            "startTime": start_time,
            "endTime": end_time,
            "status": "ACCEPTED",
            "attendees": [{ "email": email, "name": "Bo", "timeZone": "UTC" }],
        }
    })
    .to_string()
}

/// POST a body to the webhook endpoint signed with the test secret
pub fn signed_request(body: &str) -> Request<Body> {
    let signature = SignatureVerifier::new(WEBHOOK_SECRET).sign(body.as_bytes());
    Request::builder()
        .uri("/api/webhooks/cal")
        .method("POST")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf8")
}

/// Notifications are sent in the background after the response, so
/// poll until the mock has been hit.
pub async fn wait_for_hit(mock: &mockito::Mock) {
    for _ in 0..100 {
        if mock.matched_async().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Notification was never sent");
}
