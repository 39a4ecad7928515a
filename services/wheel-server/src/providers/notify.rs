use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::debug;

use super::NotificationSink;

/// Posts events to a configured webhook. Delivery is best-effort: failures
/// are logged at debug and never surface to orchestration.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>, request_timeout: Duration) -> Self {
        WebhookNotifier {
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            url,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, event: &str, payload: serde_json::Value) {
        let Some(url) = &self.url else {
            return;
        };
        let body = json!({
            "event": event,
            "data": payload,
            "sentAt": Utc::now(),
        });
        match self.http.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                debug!(event, status = %response.status(), "webhook delivery rejected");
            }
            Err(error) => {
                debug!(event, error = %error, "webhook delivery failed");
            }
        }
    }
}
