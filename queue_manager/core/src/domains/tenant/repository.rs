use super::model::Tenant;
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::Id;

/// Tenant repository. Unlike every other repository in this crate, lookups
/// here are not themselves tenant-scoped — a tenant is the scope.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn get_by_id(&self, id: Id) -> Result<Option<Tenant>, QueueError>;
    async fn get_by_domain(&self, domain: &str) -> Result<Option<Tenant>, QueueError>;
    async fn get_by_api_key(&self, api_key: &str) -> Result<Option<Tenant>, QueueError>;
    async fn add(&self, tenant: &Tenant) -> Result<Tenant, QueueError>;
    async fn update(&self, tenant: &Tenant) -> Result<Tenant, QueueError>;
    /// Soft delete; cascades to every child record (spec.md §3 Lifecycles).
    async fn soft_delete(&self, id: Id) -> Result<(), QueueError>;
}
