use async_trait::async_trait;
use queue_manager_core::domains::retention::service::ColdStorageArchiver;
use shared_error::QueueError;
use shared_types::Id;

/// Cold-storage archiver (spec.md §6: "external collaborator specified only
/// by `archive`/`restore`"). Deployments swap this for an object-storage
/// client; this implementation logs the batch and fabricates a stable
/// location URI so `RetentionService::apply_one` has something to record.
pub struct OpaqueColdStorageArchiver;

#[async_trait]
impl ColdStorageArchiver for OpaqueColdStorageArchiver {
    async fn archive(&self, tenant_id: Id, entity_type: &str, ids: &[Id]) -> Result<String, QueueError> {
        let location = format!("archive://{tenant_id}/{entity_type}/{}", chrono::Utc::now().timestamp());
        tracing::info!(tenant_id = %tenant_id, entity_type, count = ids.len(), location, "archived retention batch");
        Ok(location)
    }
}
