pub mod models;
pub use models::*;

use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;

/// Sends the notifications a booking lifecycle event calls for.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the recipient their booking went through
    async fn booking_confirmed(&self, recipient: &Recipient) -> Result<(), Error>;
}

/// Triggers a Knock workflow. Delivery, channels and the in-app feed
/// are configured on the workflow itself.
#[derive(Clone)]
pub struct KnockNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    workflow_key: String,
}

impl KnockNotifier {
    pub fn new(api_url: &str, api_key: &str, workflow_key: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            workflow_key: workflow_key.to_string(),
        })
    }

    pub async fn trigger_workflow(
        &self,
        payload: &WorkflowTrigger,
    ) -> Result<WorkflowTriggerResponse, Error> {
        let url = format!(
            "{}/v1/workflows/{}/trigger",
            self.api_url, self.workflow_key
        );
        let res = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Workflow {} trigger failed with {}: {}",
                self.workflow_key,
                status,
                body
            ));
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl Notifier for KnockNotifier {
    async fn booking_confirmed(&self, recipient: &Recipient) -> Result<(), Error> {
        let payload = WorkflowTrigger {
            recipients: vec![recipient.clone()],
        };
        let resp = self.trigger_workflow(&payload).await?;
        tracing::debug!(
            "Triggered workflow {} for {}: run {}",
            self.workflow_key,
            recipient.id,
            resp.workflow_run_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn recipient() -> Recipient {
        Recipient {
            id: "u1".to_string(),
            email: Some("a@x.com".to_string()),
            name: Some("A".to_string()),
        }
    }

    #[tokio::test]
    async fn it_triggers_the_workflow_for_the_recipient() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflows/booking-confirmed/trigger")
            .match_header("authorization", "Bearer sk_test")
            .match_body(Matcher::Json(json!({
                "recipients": [{"id": "u1", "email": "a@x.com", "name": "A"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"workflow_run_id": "run_123"}"#)
            .create_async()
            .await;

        let notifier = KnockNotifier::new(&server.url(), "sk_test", "booking-confirmed").unwrap();
        notifier.booking_confirmed(&recipient()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn it_omits_missing_recipient_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflows/booking-confirmed/trigger")
            .match_body(Matcher::Json(json!({"recipients": [{"id": "u1"}]})))
            .with_status(200)
            .with_body(r#"{"workflow_run_id": "run_123"}"#)
            .create_async()
            .await;

        let notifier = KnockNotifier::new(&server.url(), "sk_test", "booking-confirmed").unwrap();
        let recipient = Recipient {
            id: "u1".to_string(),
            email: None,
            name: None,
        };
        notifier.booking_confirmed(&recipient).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn it_errors_on_a_rejected_trigger() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/workflows/booking-confirmed/trigger")
            .with_status(401)
            .with_body(r#"{"message": "invalid api key"}"#)
            .create_async()
            .await;

        let notifier = KnockNotifier::new(&server.url(), "bad", "booking-confirmed").unwrap();
        let err = notifier.booking_confirmed(&recipient()).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
