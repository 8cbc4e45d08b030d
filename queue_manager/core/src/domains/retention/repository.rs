use super::model::{Backup, RetentionPolicy};
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::Id;

#[async_trait]
pub trait RetentionPolicyRepository: Send + Sync {
    async fn get_by_id(&self, tenant_id: Id, policy_id: Id) -> Result<Option<RetentionPolicy>, QueueError>;
    async fn list_active(&self, tenant_id: Id) -> Result<Vec<RetentionPolicy>, QueueError>;
    async fn add(&self, policy: &RetentionPolicy) -> Result<RetentionPolicy, QueueError>;

    /// Selects the ids of entities of `entity_type` older than `cutoff`
    /// matching the policy's stored criteria. The entity store itself is
    /// polymorphic across entity types, so this returns opaque ids for the
    /// caller to hand to `delete`/`archive`.
    async fn select_expired(&self, tenant_id: Id, entity_type: &str, cutoff: chrono::DateTime<chrono::Utc>) -> Result<Vec<Id>, QueueError>;

    async fn delete_entities(&self, tenant_id: Id, entity_type: &str, ids: &[Id]) -> Result<u64, QueueError>;
}

#[async_trait]
pub trait BackupRepository: Send + Sync {
    async fn get_by_id(&self, backup_id: Id) -> Result<Option<Backup>, QueueError>;
    async fn list(&self, tenant_id: Option<Id>) -> Result<Vec<Backup>, QueueError>;
    async fn add(&self, backup: &Backup) -> Result<Backup, QueueError>;
    async fn update(&self, backup: &Backup) -> Result<Backup, QueueError>;
}
