use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::Id;
use uuid::Uuid;

/// Stable tags for transport (spec.md §9: "Domain events as reflective
/// record types become tagged variants with stable string `event_type`
/// tags").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserEnqueued,
    PositionChanged,
    UserReleased,
    UserDropped,
    SessionServing,
    QueueUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserEnqueued => "user_enqueued",
            EventKind::PositionChanged => "position_changed",
            EventKind::UserReleased => "user_released",
            EventKind::UserDropped => "user_dropped",
            EventKind::SessionServing => "session_serving",
            EventKind::QueueUpdated => "queue_updated",
        }
    }

    /// Analytics rollup inputs are critical: they are never dropped under
    /// bus overload (spec.md §4.14).
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            EventKind::UserEnqueued | EventKind::UserReleased | EventKind::UserDropped
        )
    }
}

/// `{event_id, occurred_at, tenant_id}` plus the entity diff (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Id,
    pub occurred_at: DateTime<Utc>,
    pub tenant_id: Id,
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(tenant_id: Id, kind: EventKind, payload: serde_json::Value) -> Self {
        Self { event_id: Uuid::new_v4(), occurred_at: Utc::now(), tenant_id, kind, payload }
    }

    pub fn is_critical(&self) -> bool {
        self.kind.is_critical()
    }
}
