use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::retention::model::{RetentionAction, RetentionPolicy};
use queue_manager_core::domains::retention::repository::RetentionPolicyRepository;
use shared_error::QueueError;
use shared_types::Id;
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct PolicyRow {
    policy_id: Id,
    tenant_id: Id,
    entity_type: String,
    retention_period_seconds: i64,
    action: String,
    criteria: serde_json::Value,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PolicyRow> for RetentionPolicy {
    type Error = QueueError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        Ok(RetentionPolicy {
            policy_id: row.policy_id,
            tenant_id: row.tenant_id,
            entity_type: row.entity_type,
            retention_period: chrono::Duration::seconds(row.retention_period_seconds),
            action: parse_action(&row.action)?,
            criteria: row.criteria,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

fn parse_action(s: &str) -> Result<RetentionAction, QueueError> {
    match s {
        "delete" => Ok(RetentionAction::Delete),
        "archive" => Ok(RetentionAction::Archive),
        other => Err(QueueError::invalid_argument(format!("unknown retention action: {other}"))),
    }
}

fn action_str(action: RetentionAction) -> &'static str {
    match action {
        RetentionAction::Delete => "delete",
        RetentionAction::Archive => "archive",
    }
}

/// Tables a retention policy's `entity_type` may name. Kept narrow
/// deliberately: the store is polymorphic across entity types in the
/// trait's contract, but only session history and the audit trail are
/// named as retention subjects in spec.md §4.12.
fn table_for(entity_type: &str) -> Result<&'static str, QueueError> {
    match entity_type {
        "session" => Ok("user_sessions"),
        "audit" => Ok("audit_entries"),
        other => Err(QueueError::invalid_argument(format!("no retention table mapped for entity_type {other}"))),
    }
}

fn id_column_for(entity_type: &str) -> &'static str {
    match entity_type {
        "session" => "session_id",
        "audit" => "audit_id",
        _ => "id",
    }
}

#[derive(Clone)]
pub struct PgRetentionPolicyRepository {
    pool: PgPool,
}

impl PgRetentionPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RetentionPolicyRepository for PgRetentionPolicyRepository {
    async fn get_by_id(&self, tenant_id: Id, policy_id: Id) -> Result<Option<RetentionPolicy>, QueueError> {
        let row = sqlx::query_as::<_, PolicyRow>(
            "SELECT * FROM retention_policies WHERE policy_id = $1 AND tenant_id = $2",
        )
        .bind(policy_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_active(&self, tenant_id: Id) -> Result<Vec<RetentionPolicy>, QueueError> {
        let rows = sqlx::query_as::<_, PolicyRow>(
            "SELECT * FROM retention_policies WHERE tenant_id = $1 AND active = true",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add(&self, policy: &RetentionPolicy) -> Result<RetentionPolicy, QueueError> {
        let row = sqlx::query_as::<_, PolicyRow>(
            r#"
            INSERT INTO retention_policies (
                policy_id, tenant_id, entity_type, retention_period_seconds, action, criteria, active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(policy.policy_id)
        .bind(policy.tenant_id)
        .bind(&policy.entity_type)
        .bind(policy.retention_period.num_seconds())
        .bind(action_str(policy.action))
        .bind(&policy.criteria)
        .bind(policy.active)
        .bind(policy.created_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn select_expired(&self, tenant_id: Id, entity_type: &str, cutoff: DateTime<Utc>) -> Result<Vec<Id>, QueueError> {
        let table = table_for(entity_type)?;
        let id_col = id_column_for(entity_type);
        let time_col = if entity_type == "audit" { "timestamp" } else { "enqueued_at" };
        let sql = format!("SELECT {id_col} AS id FROM {table} WHERE tenant_id = $1 AND {time_col} < $2");
        let ids: Vec<Id> = sqlx::query_scalar(&sql).bind(tenant_id).bind(cutoff).fetch_all(&self.pool).await?;
        Ok(ids)
    }

    async fn delete_entities(&self, tenant_id: Id, entity_type: &str, ids: &[Id]) -> Result<u64, QueueError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let table = table_for(entity_type)?;
        let id_col = id_column_for(entity_type);
        let sql = format!("DELETE FROM {table} WHERE tenant_id = $1 AND {id_col} = ANY($2)");
        let result = sqlx::query(&sql).bind(tenant_id).bind(ids).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_its_column_string() {
        for action in [RetentionAction::Delete, RetentionAction::Archive] {
            assert_eq!(parse_action(action_str(action)).unwrap(), action);
        }
    }

    #[test]
    fn only_session_and_audit_entity_types_map_to_a_table() {
        assert_eq!(table_for("session").unwrap(), "user_sessions");
        assert_eq!(table_for("audit").unwrap(), "audit_entries");
        assert!(table_for("webhook_delivery").is_err());
    }
}
