use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::audit::{AuditEntry, AuditRepository, AuditResult};
use shared_error::QueueError;
use shared_types::{Id, TimeRange};
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct AuditRow {
    audit_id: Id,
    tenant_id: Id,
    actor_id: Id,
    action: String,
    entity_type: String,
    entity_id: Option<Id>,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    ip: Option<String>,
    user_agent: Option<String>,
    result: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = QueueError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditEntry {
            audit_id: row.audit_id,
            tenant_id: row.tenant_id,
            actor_id: row.actor_id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            before: row.before,
            after: row.after,
            ip: row.ip,
            user_agent: row.user_agent,
            result: parse_result(&row.result)?,
            timestamp: row.timestamp,
        })
    }
}

fn parse_result(s: &str) -> Result<AuditResult, QueueError> {
    match s {
        "success" => Ok(AuditResult::Success),
        "denied" => Ok(AuditResult::Denied),
        "error" => Ok(AuditResult::Error),
        other => Err(QueueError::invalid_argument(format!("unknown audit result: {other}"))),
    }
}

fn result_str(result: AuditResult) -> &'static str {
    match result {
        AuditResult::Success => "success",
        AuditResult::Denied => "denied",
        AuditResult::Error => "error",
    }
}

#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn record(&self, entry: &AuditEntry) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            INSERT INTO audit_entries (
                audit_id, tenant_id, actor_id, action, entity_type, entity_id,
                before, after, ip, user_agent, result, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.audit_id)
        .bind(entry.tenant_id)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.before)
        .bind(&entry.after)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(result_str(entry.result))
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn by_time_range(&self, tenant_id: Id, range: TimeRange) -> Result<Vec<AuditEntry>, QueueError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_entries WHERE tenant_id = $1 AND timestamp >= $2 AND timestamp < $3 ORDER BY timestamp",
        )
        .bind(tenant_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn by_entity(&self, tenant_id: Id, entity_type: &str, entity_id: Id) -> Result<Vec<AuditEntry>, QueueError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_entries WHERE tenant_id = $1 AND entity_type = $2 AND entity_id = $3 ORDER BY timestamp",
        )
        .bind(tenant_id)
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn by_actor(&self, tenant_id: Id, actor_id: Id, range: TimeRange) -> Result<Vec<AuditEntry>, QueueError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_entries WHERE tenant_id = $1 AND actor_id = $2 AND timestamp >= $3 AND timestamp < $4 ORDER BY timestamp",
        )
        .bind(tenant_id)
        .bind(actor_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn archive_older_than(&self, tenant_id: Id, cutoff: DateTime<Utc>) -> Result<u64, QueueError> {
        let result = sqlx::query("DELETE FROM audit_entries WHERE tenant_id = $1 AND timestamp < $2")
            .bind(tenant_id)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_round_trips_through_its_column_string() {
        for result in [AuditResult::Success, AuditResult::Denied, AuditResult::Error] {
            assert_eq!(parse_result(result_str(result)).unwrap(), result);
        }
    }
}
