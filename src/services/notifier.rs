use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::submission::WebhookPayload;

/// Delivers a completion notice to a caller-supplied callback target.
///
/// Delivery is a single best-effort attempt. Implementations log their own
/// failures and report only the HTTP status they got, if any.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &str, payload: &WebhookPayload) -> Option<u16>;
}

/// Posts the payload as JSON over HTTP.
pub struct WebhookNotifier {
    http: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifyError::Http)?;
        Ok(Self { http })
    }

    async fn post(&self, target: &str, payload: &WebhookPayload) -> Result<u16, NotifyError> {
        let response = self
            .http
            .post(target)
            .json(payload)
            .send()
            .await
            .map_err(NotifyError::Http)?;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, target: &str, payload: &WebhookPayload) -> Option<u16> {
        match self.post(target, payload).await {
            Ok(status) => {
                tracing::info!(
                    job_id = %payload.request_id,
                    target = %target,
                    status,
                    "Webhook delivered"
                );
                Some(status)
            }
            Err(e) => {
                metrics::counter!("webhook_failures_total").increment(1);
                tracing::warn!(
                    job_id = %payload.request_id,
                    target = %target,
                    error = %e,
                    "Webhook delivery failed"
                );
                None
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}
