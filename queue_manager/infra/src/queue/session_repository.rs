use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::queue::domain::model::{Priority, SessionStatus, UserSession};
use queue_manager_core::domains::queue::domain::repository::SessionRepository;
use shared_error::QueueError;
use shared_types::{Id, TimeRange};
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct SessionRow {
    session_id: Id,
    queue_id: Id,
    tenant_id: Id,
    user_identifier: String,
    status: String,
    priority: String,
    enqueued_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
    served_at: Option<DateTime<Utc>>,
    position: i64,
    metadata: serde_json::Value,
    version: i64,
}

impl TryFrom<SessionRow> for UserSession {
    type Error = QueueError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(UserSession {
            session_id: row.session_id,
            queue_id: row.queue_id,
            tenant_id: row.tenant_id,
            user_identifier: row.user_identifier,
            status: parse_status(&row.status)?,
            priority: parse_priority(&row.priority)?,
            enqueued_at: row.enqueued_at,
            released_at: row.released_at,
            served_at: row.served_at,
            position: row.position as u64,
            metadata: row.metadata,
            version: row.version,
        })
    }
}

fn parse_status(s: &str) -> Result<SessionStatus, QueueError> {
    match s {
        "waiting" => Ok(SessionStatus::Waiting),
        "serving" => Ok(SessionStatus::Serving),
        "released" => Ok(SessionStatus::Released),
        "dropped" => Ok(SessionStatus::Dropped),
        other => Err(QueueError::invalid_argument(format!("unknown session status: {other}"))),
    }
}

fn status_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Waiting => "waiting",
        SessionStatus::Serving => "serving",
        SessionStatus::Released => "released",
        SessionStatus::Dropped => "dropped",
    }
}

fn parse_priority(s: &str) -> Result<Priority, QueueError> {
    match s {
        "low" => Ok(Priority::Low),
        "standard" => Ok(Priority::Standard),
        "premium" => Ok(Priority::Premium),
        "vip" => Ok(Priority::VIP),
        other => Err(QueueError::invalid_argument(format!("unknown priority: {other}"))),
    }
}

fn priority_str(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Standard => "standard",
        Priority::Premium => "premium",
        Priority::VIP => "vip",
    }
}

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn get_by_id(&self, tenant_id: Id, session_id: Id) -> Result<Option<UserSession>, QueueError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM user_sessions WHERE session_id = $1 AND tenant_id = $2",
        )
        .bind(session_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_active_by_identifier(
        &self,
        queue_id: Id,
        user_identifier: &str,
    ) -> Result<Option<UserSession>, QueueError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM user_sessions WHERE queue_id = $1 AND user_identifier = $2 AND status IN ('waiting', 'serving') ORDER BY enqueued_at LIMIT 1",
        )
        .bind(queue_id)
        .bind(user_identifier)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_waiting_by_queue_ordered(&self, queue_id: Id) -> Result<Vec<UserSession>, QueueError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT * FROM user_sessions
            WHERE queue_id = $1 AND status = 'waiting'
            ORDER BY
                CASE priority
                    WHEN 'vip' THEN 3
                    WHEN 'premium' THEN 2
                    WHEN 'standard' THEN 1
                    WHEN 'low' THEN 0
                END DESC,
                enqueued_at ASC
            "#,
        )
        .bind(queue_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_by_status(&self, queue_id: Id, status: SessionStatus) -> Result<u64, QueueError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_sessions WHERE queue_id = $1 AND status = $2",
        )
        .bind(queue_id)
        .bind(status_str(status))
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn sessions_in_range(
        &self,
        tenant_id: Id,
        queue_id: Id,
        range: TimeRange,
    ) -> Result<Vec<UserSession>, QueueError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM user_sessions WHERE tenant_id = $1 AND queue_id = $2 AND enqueued_at >= $3 AND enqueued_at < $4 ORDER BY enqueued_at",
        )
        .bind(tenant_id)
        .bind(queue_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add(&self, session: &UserSession) -> Result<UserSession, QueueError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO user_sessions (
                session_id, queue_id, tenant_id, user_identifier, status, priority,
                enqueued_at, released_at, served_at, position, metadata, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(session.session_id)
        .bind(session.queue_id)
        .bind(session.tenant_id)
        .bind(&session.user_identifier)
        .bind(status_str(session.status))
        .bind(priority_str(session.priority))
        .bind(session.enqueued_at)
        .bind(session.released_at)
        .bind(session.served_at)
        .bind(session.position as i64)
        .bind(&session.metadata)
        .bind(session.version)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    /// Optimistic-concurrent update: the `WHERE version = $N` clause is the
    /// CAS; a zero-row update surfaces as `Conflict` (spec.md §4.2).
    async fn update(&self, session: &UserSession) -> Result<UserSession, QueueError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE user_sessions SET
                status = $3, priority = $4, released_at = $5, served_at = $6,
                position = $7, metadata = $8, version = version + 1
            WHERE session_id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(session.session_id)
        .bind(session.version)
        .bind(status_str(session.status))
        .bind(priority_str(session.priority))
        .bind(session.released_at)
        .bind(session.served_at)
        .bind(session.position as i64)
        .bind(&session.metadata)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            QueueError::conflict("session version changed concurrently")
                .with_tenant(session.tenant_id)
                .with_entity(session.session_id)
        })?;
        row.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_column_string() {
        for status in [SessionStatus::Waiting, SessionStatus::Serving, SessionStatus::Released, SessionStatus::Dropped] {
            assert_eq!(parse_status(status_str(status)).unwrap(), status);
        }
    }

    #[test]
    fn priority_round_trips_through_its_column_string() {
        for priority in [Priority::Low, Priority::Standard, Priority::Premium, Priority::VIP] {
            assert_eq!(parse_priority(priority_str(priority)).unwrap(), priority);
        }
    }

    #[test]
    fn unknown_status_is_rejected_rather_than_defaulted() {
        assert!(parse_status("pending").is_err());
    }

    #[test]
    fn unknown_priority_is_rejected_rather_than_defaulted() {
        assert!(parse_priority("gold").is_err());
    }
}
