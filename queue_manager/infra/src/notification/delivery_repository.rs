use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::notification::{DeliveryRepository, WebhookDelivery};
use shared_error::QueueError;
use shared_types::Id;
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct DeliveryRow {
    delivery_id: Id,
    webhook_id: Id,
    tenant_id: Id,
    event_id: Id,
    payload: serde_json::Value,
    status_code: Option<i32>,
    delivered: bool,
    retryable: bool,
    error: Option<String>,
    attempted_at: DateTime<Utc>,
}

impl From<DeliveryRow> for WebhookDelivery {
    fn from(row: DeliveryRow) -> Self {
        WebhookDelivery {
            delivery_id: row.delivery_id,
            webhook_id: row.webhook_id,
            tenant_id: row.tenant_id,
            event_id: row.event_id,
            payload: row.payload,
            status_code: row.status_code.map(|c| c as u16),
            delivered: row.delivered,
            retryable: row.retryable,
            error: row.error,
            attempted_at: row.attempted_at,
        }
    }
}

#[derive(Clone)]
pub struct PgDeliveryRepository {
    pool: PgPool,
}

impl PgDeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryRepository for PgDeliveryRepository {
    async fn record(&self, delivery: &WebhookDelivery) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_deliveries (
                delivery_id, webhook_id, tenant_id, event_id, payload, status_code,
                delivered, retryable, error, attempted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(delivery.delivery_id)
        .bind(delivery.webhook_id)
        .bind(delivery.tenant_id)
        .bind(delivery.event_id)
        .bind(&delivery.payload)
        .bind(delivery.status_code.map(|c| c as i32))
        .bind(delivery.delivered)
        .bind(delivery.retryable)
        .bind(&delivery.error)
        .bind(delivery.attempted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_webhook(&self, tenant_id: Id, webhook_id: Id) -> Result<Vec<WebhookDelivery>, QueueError> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            "SELECT * FROM webhook_deliveries WHERE tenant_id = $1 AND webhook_id = $2 ORDER BY attempted_at DESC",
        )
        .bind(tenant_id)
        .bind(webhook_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, tenant_id: Id, delivery_id: Id) -> Result<Option<WebhookDelivery>, QueueError> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            "SELECT * FROM webhook_deliveries WHERE tenant_id = $1 AND delivery_id = $2",
        )
        .bind(tenant_id)
        .bind(delivery_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}
