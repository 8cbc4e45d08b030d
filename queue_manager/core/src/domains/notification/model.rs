use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_events::EventKind;
use shared_types::{Entity, Id};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Whatsapp,
    Push,
    Webhook,
}

/// Tenant-configured webhook subscriber (spec.md §4.10, §6).
#[derive(Debug, Clone)]
pub struct Webhook {
    pub webhook_id: Id,
    pub tenant_id: Id,
    pub url: String,
    pub event_types: Vec<EventKind>,
    pub headers: HashMap<String, String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Webhook {
    pub fn subscribes_to(&self, kind: EventKind) -> bool {
        self.active && self.event_types.contains(&kind)
    }
}

impl Entity for Webhook {
    fn id(&self) -> Id {
        self.webhook_id
    }

    fn tenant_id(&self) -> Id {
        self.tenant_id
    }

    fn deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Delivery record for one webhook POST attempt (spec.md §4.10: "delivery
/// records include the HTTP status and the retryable flag").
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub delivery_id: Id,
    pub webhook_id: Id,
    pub tenant_id: Id,
    pub event_id: Id,
    /// The exact request body that was POSTed, kept so `retry_delivery`
    /// (spec.md §6) can resend it rather than reconstruct it from the event.
    pub payload: Value,
    pub status_code: Option<u16>,
    pub delivered: bool,
    pub retryable: bool,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// `NotificationEvent{delivered=false, error}` for a non-webhook channel
/// attempt (spec.md §4.10). Logged, never fails the originating operation.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub channel: NotificationChannel,
    pub recipient: String,
    pub delivered: bool,
    pub error: Option<String>,
    pub payload: Value,
}
