use super::model::AuditEntry;
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::{Id, TimeRange};

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<(), QueueError>;

    async fn by_time_range(&self, tenant_id: Id, range: TimeRange) -> Result<Vec<AuditEntry>, QueueError>;

    async fn by_entity(&self, tenant_id: Id, entity_type: &str, entity_id: Id) -> Result<Vec<AuditEntry>, QueueError>;

    async fn by_actor(&self, tenant_id: Id, actor_id: Id, range: TimeRange) -> Result<Vec<AuditEntry>, QueueError>;

    /// spec.md §4.7: "Cleanup archives entries older than a configured
    /// cutoff." Returns the count removed; entries themselves are never
    /// mutated, only deleted in bulk past the cutoff.
    async fn archive_older_than(&self, tenant_id: Id, cutoff: chrono::DateTime<chrono::Utc>) -> Result<u64, QueueError>;
}
