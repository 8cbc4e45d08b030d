//! Notification fan-out (spec.md §4.10, §6). The email/SMS/WhatsApp
//! transports and the webhook HTTP client are external collaborators,
//! specified only by these traits; concrete implementations live in
//! `queue_manager_infra`.

use super::model::{NotificationChannel, WebhookDelivery};
use super::repository::{DeliveryRepository, WebhookRepository};
use async_trait::async_trait;
use shared_error::QueueError;
use shared_events::{DomainEvent, ExternalSink};
use shared_types::Id;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// `{accepted, error?}` (spec.md §6).
#[derive(Debug, Clone)]
pub struct SinkResponse {
    pub accepted: bool,
    pub error: Option<String>,
}

/// spec.md §6: `send(to, subject?, body) -> {accepted, error?}`, one shape
/// shared by the email/SMS/WhatsApp/push transports.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn channel(&self) -> NotificationChannel;
    async fn send(&self, to: &str, subject: Option<&str>, body: &str) -> SinkResponse;
}

#[derive(Debug, Clone)]
pub struct WebhookPostOutcome {
    pub status_code: Option<u16>,
    pub retryable: bool,
    pub error: Option<String>,
}

/// HTTP delivery for webhook subscribers; a single attempt per spec.md §4.10
/// ("a single attempt with timeout ≤ 5s is made" for channel sinks;
/// webhooks get the 30s deadline named in spec.md §5).
#[async_trait]
pub trait WebhookPoster: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: serde_json::Value,
        timeout: Duration,
    ) -> WebhookPostOutcome;
}

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);
pub const CHANNEL_SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives webhook delivery off the event bus: registered as a
/// [`shared_events::ExternalSink`], invoked by the bus's bounded worker pool.
pub struct NotificationFanout {
    webhooks: Arc<dyn WebhookRepository>,
    deliveries: Arc<dyn DeliveryRepository>,
    poster: Arc<dyn WebhookPoster>,
    channel_sinks: Vec<Arc<dyn NotificationSink>>,
}

impl NotificationFanout {
    pub fn new(
        webhooks: Arc<dyn WebhookRepository>,
        deliveries: Arc<dyn DeliveryRepository>,
        poster: Arc<dyn WebhookPoster>,
        channel_sinks: Vec<Arc<dyn NotificationSink>>,
    ) -> Self {
        Self { webhooks, deliveries, poster, channel_sinks }
    }

    async fn dispatch_webhooks(&self, event: &DomainEvent) -> Result<(), QueueError> {
        let subscribed = self.webhooks.list_subscribed(event.tenant_id, event.kind).await?;
        let body = serde_json::json!({
            "event_type": event.kind.as_str(),
            "tenant_id": event.tenant_id,
            "payload": event.payload,
            "occurred_at": event.occurred_at,
        });

        for webhook in subscribed {
            if webhook.tenant_id != event.tenant_id || !webhook.subscribes_to(event.kind) {
                continue;
            }
            let outcome = self.poster.post(&webhook.url, &webhook.headers, body.clone(), WEBHOOK_TIMEOUT).await;
            if let Some(err) = &outcome.error {
                tracing::warn!(webhook_id = %webhook.webhook_id, error = %err, "webhook delivery failed");
            }
            let delivery = WebhookDelivery {
                delivery_id: Id::new_v4(),
                webhook_id: webhook.webhook_id,
                tenant_id: webhook.tenant_id,
                event_id: event.event_id,
                payload: body.clone(),
                status_code: outcome.status_code,
                delivered: outcome.status_code.is_some_and(|s| (200..300).contains(&s)),
                retryable: outcome.retryable,
                error: outcome.error,
                attempted_at: chrono::Utc::now(),
            };
            self.deliveries.record(&delivery).await?;
        }
        Ok(())
    }

    /// Re-POSTs a prior delivery's exact payload and records a fresh
    /// attempt (spec.md §6 `retry_delivery`). Does not check `retryable` —
    /// that flag informs a caller's decision to retry, it isn't itself a
    /// gate here.
    pub async fn retry_delivery(&self, tenant_id: Id, delivery_id: Id) -> Result<WebhookDelivery, QueueError> {
        let prior = self
            .deliveries
            .get_by_id(tenant_id, delivery_id)
            .await?
            .ok_or_else(|| QueueError::not_found("delivery not found").with_tenant(tenant_id).with_entity(delivery_id))?;
        let webhook = self
            .webhooks
            .get_by_id(tenant_id, prior.webhook_id)
            .await?
            .ok_or_else(|| QueueError::not_found("webhook not found").with_tenant(tenant_id).with_entity(prior.webhook_id))?;

        let outcome = self.poster.post(&webhook.url, &webhook.headers, prior.payload.clone(), WEBHOOK_TIMEOUT).await;
        let delivery = WebhookDelivery {
            delivery_id: Id::new_v4(),
            webhook_id: webhook.webhook_id,
            tenant_id: webhook.tenant_id,
            event_id: prior.event_id,
            payload: prior.payload,
            status_code: outcome.status_code,
            delivered: outcome.status_code.is_some_and(|s| (200..300).contains(&s)),
            retryable: outcome.retryable,
            error: outcome.error,
            attempted_at: chrono::Utc::now(),
        };
        self.deliveries.record(&delivery).await?;
        Ok(delivery)
    }

    /// Sends a synthetic ping to `webhook_id` so a tenant can confirm their
    /// endpoint is reachable before relying on it (spec.md §6 `test_webhook`).
    /// Recorded as a delivery like any other attempt.
    pub async fn test_webhook(&self, tenant_id: Id, webhook_id: Id) -> Result<WebhookDelivery, QueueError> {
        let webhook = self
            .webhooks
            .get_by_id(tenant_id, webhook_id)
            .await?
            .ok_or_else(|| QueueError::not_found("webhook not found").with_tenant(tenant_id).with_entity(webhook_id))?;

        let body = serde_json::json!({
            "event_type": "test",
            "tenant_id": tenant_id,
            "payload": serde_json::Value::Null,
            "occurred_at": chrono::Utc::now(),
        });
        let outcome = self.poster.post(&webhook.url, &webhook.headers, body.clone(), WEBHOOK_TIMEOUT).await;
        let delivery = WebhookDelivery {
            delivery_id: Id::new_v4(),
            webhook_id: webhook.webhook_id,
            tenant_id: webhook.tenant_id,
            event_id: Id::new_v4(),
            payload: body,
            status_code: outcome.status_code,
            delivered: outcome.status_code.is_some_and(|s| (200..300).contains(&s)),
            retryable: outcome.retryable,
            error: outcome.error,
            attempted_at: chrono::Utc::now(),
        };
        self.deliveries.record(&delivery).await?;
        Ok(delivery)
    }

    /// Attempts every enabled channel sink for `to`, logging failures
    /// without surfacing them to the caller (spec.md §4.10).
    pub async fn notify_channels(&self, to: &str, subject: Option<&str>, body: &str) {
        for sink in &self.channel_sinks {
            let response = tokio::time::timeout(CHANNEL_SINK_TIMEOUT, sink.send(to, subject, body))
                .await
                .unwrap_or_else(|_| SinkResponse { accepted: false, error: Some("timed out".into()) });
            if !response.accepted {
                tracing::warn!(channel = ?sink.channel(), to, error = ?response.error, "channel notification failed");
            }
        }
    }
}

#[async_trait]
impl ExternalSink for NotificationFanout {
    async fn dispatch(&self, event: &DomainEvent) -> Result<(), QueueError> {
        if let Err(err) = self.dispatch_webhooks(event).await {
            tracing::warn!(error = %err, "webhook fan-out failed for event");
        }
        Ok(())
    }
}
