use super::model::{Queue, SessionStatus, UserSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_error::QueueError;
use shared_types::Id;

#[async_trait]
pub trait QueueRepository: Send + Sync {
    async fn get_by_id(&self, tenant_id: Id, queue_id: Id) -> Result<Option<Queue>, QueueError>;
    async fn list_by_tenant(&self, tenant_id: Id) -> Result<Vec<Queue>, QueueError>;
    async fn list_active(&self) -> Result<Vec<Queue>, QueueError>;
    async fn add(&self, queue: &Queue) -> Result<Queue, QueueError>;
    async fn update(&self, queue: &Queue) -> Result<Queue, QueueError>;
    async fn soft_delete(&self, tenant_id: Id, queue_id: Id) -> Result<(), QueueError>;
    /// spec.md §4.8.4 step 4: advances `last_release_at` only, outside the
    /// general `update` path so the releaser's hot loop avoids a full
    /// read-modify-write of the queue row.
    async fn advance_last_release_at(
        &self,
        queue_id: Id,
        new_last_release_at: DateTime<Utc>,
        expected_last_release_at: Option<DateTime<Utc>>,
    ) -> Result<(), QueueError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_by_id(&self, tenant_id: Id, session_id: Id) -> Result<Option<UserSession>, QueueError>;

    /// spec.md §4.8.2 step 2: idempotency lookup among non-terminal sessions.
    async fn get_active_by_identifier(
        &self,
        queue_id: Id,
        user_identifier: &str,
    ) -> Result<Option<UserSession>, QueueError>;

    /// Ordered per spec.md §4.8.1; used both for reads and as the releaser's
    /// working set.
    async fn get_waiting_by_queue_ordered(&self, queue_id: Id) -> Result<Vec<UserSession>, QueueError>;

    async fn count_by_status(&self, queue_id: Id, status: SessionStatus) -> Result<u64, QueueError>;

    async fn sessions_in_range(
        &self,
        tenant_id: Id,
        queue_id: Id,
        range: shared_types::TimeRange,
    ) -> Result<Vec<UserSession>, QueueError>;

    async fn add(&self, session: &UserSession) -> Result<UserSession, QueueError>;

    /// Optimistic-concurrent update (spec.md §4.2): fails `Conflict` if
    /// `session.version` no longer matches the stored row.
    async fn update(&self, session: &UserSession) -> Result<UserSession, QueueError>;
}
