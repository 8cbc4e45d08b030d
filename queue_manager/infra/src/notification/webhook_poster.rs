use async_trait::async_trait;
use queue_manager_core::domains::notification::sink::{WebhookPostOutcome, WebhookPoster};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Single-attempt HTTP POST (spec.md §4.10: "a single attempt with timeout").
/// Retries are a queue-engine concept (spec.md §4.8.7), not a notification one.
pub struct ReqwestWebhookPoster {
    client: Client,
}

impl ReqwestWebhookPoster {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for ReqwestWebhookPoster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookPoster for ReqwestWebhookPoster {
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: serde_json::Value,
        timeout: Duration,
    ) -> WebhookPostOutcome {
        let mut request = self.client.post(url).json(&body).timeout(timeout);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                WebhookPostOutcome {
                    status_code: Some(status.as_u16()),
                    retryable: status.is_server_error(),
                    error: if status.is_success() { None } else { Some(format!("http status {status}")) },
                }
            },
            Err(err) => WebhookPostOutcome {
                status_code: None,
                retryable: err.is_timeout() || err.is_connect(),
                error: Some(err.to_string()),
            },
        }
    }
}
