use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::notification::{Webhook, WebhookRepository};
use shared_error::QueueError;
use shared_events::EventKind;
use shared_types::Id;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

#[derive(FromRow)]
struct WebhookRow {
    webhook_id: Id,
    tenant_id: Id,
    url: String,
    event_types: Vec<String>,
    headers: serde_json::Value,
    active: bool,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

fn parse_event_kind(s: &str) -> Option<EventKind> {
    match s {
        "user_enqueued" => Some(EventKind::UserEnqueued),
        "position_changed" => Some(EventKind::PositionChanged),
        "user_released" => Some(EventKind::UserReleased),
        "user_dropped" => Some(EventKind::UserDropped),
        "session_serving" => Some(EventKind::SessionServing),
        "queue_updated" => Some(EventKind::QueueUpdated),
        _ => None,
    }
}

impl TryFrom<WebhookRow> for Webhook {
    type Error = QueueError;

    fn try_from(row: WebhookRow) -> Result<Self, Self::Error> {
        let event_types = row.event_types.iter().filter_map(|s| parse_event_kind(s)).collect();
        let headers: HashMap<String, String> = serde_json::from_value(row.headers)
            .map_err(|e| QueueError::invalid_argument(format!("corrupt webhook headers: {e}")))?;
        Ok(Webhook {
            webhook_id: row.webhook_id,
            tenant_id: row.tenant_id,
            url: row.url,
            event_types,
            headers,
            active: row.active,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Clone)]
pub struct PgWebhookRepository {
    pool: PgPool,
}

impl PgWebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookRepository for PgWebhookRepository {
    async fn get_by_id(&self, tenant_id: Id, webhook_id: Id) -> Result<Option<Webhook>, QueueError> {
        let row = sqlx::query_as::<_, WebhookRow>(
            "SELECT * FROM webhooks WHERE webhook_id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(webhook_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: Id) -> Result<Vec<Webhook>, QueueError> {
        let rows = sqlx::query_as::<_, WebhookRow>(
            "SELECT * FROM webhooks WHERE tenant_id = $1 AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_subscribed(&self, tenant_id: Id, kind: EventKind) -> Result<Vec<Webhook>, QueueError> {
        let rows = sqlx::query_as::<_, WebhookRow>(
            "SELECT * FROM webhooks WHERE tenant_id = $1 AND active = true AND deleted_at IS NULL AND $2 = ANY(event_types)",
        )
        .bind(tenant_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add(&self, webhook: &Webhook) -> Result<Webhook, QueueError> {
        let event_types: Vec<String> = webhook.event_types.iter().map(|k| k.as_str().to_string()).collect();
        let headers = serde_json::to_value(&webhook.headers)
            .map_err(|e| QueueError::invalid_argument(format!("could not encode headers: {e}")))?;
        let row = sqlx::query_as::<_, WebhookRow>(
            r#"
            INSERT INTO webhooks (webhook_id, tenant_id, url, event_types, headers, active, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(webhook.webhook_id)
        .bind(webhook.tenant_id)
        .bind(&webhook.url)
        .bind(&event_types)
        .bind(headers)
        .bind(webhook.active)
        .bind(webhook.created_at)
        .bind(webhook.deleted_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn soft_delete(&self, tenant_id: Id, webhook_id: Id) -> Result<(), QueueError> {
        sqlx::query("UPDATE webhooks SET deleted_at = $3, active = false WHERE webhook_id = $1 AND tenant_id = $2 AND deleted_at IS NULL")
            .bind(webhook_id)
            .bind(tenant_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_kind_round_trips_through_its_column_string() {
        for kind in [
            EventKind::UserEnqueued,
            EventKind::PositionChanged,
            EventKind::UserReleased,
            EventKind::UserDropped,
            EventKind::SessionServing,
            EventKind::QueueUpdated,
        ] {
            assert_eq!(parse_event_kind(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn an_unrecognized_event_type_is_dropped_rather_than_erroring() {
        assert_eq!(parse_event_kind("something_added_later"), None);
    }
}
