use super::model::{ApiKey, User};
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::Id;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, tenant_id: Id, user_id: Id) -> Result<Option<User>, QueueError>;
    async fn get_by_username(&self, tenant_id: Id, username: &str) -> Result<Option<User>, QueueError>;
    async fn get_by_email(&self, tenant_id: Id, email: &str) -> Result<Option<User>, QueueError>;
    async fn list_by_tenant(&self, tenant_id: Id, page: u32, page_size: u32) -> Result<Vec<User>, QueueError>;
    async fn add(&self, user: &User) -> Result<User, QueueError>;
    async fn update(&self, user: &User) -> Result<User, QueueError>;
    async fn soft_delete(&self, tenant_id: Id, user_id: Id) -> Result<(), QueueError>;
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn get_by_id(&self, tenant_id: Id, api_key_id: Id) -> Result<Option<ApiKey>, QueueError>;
    /// `prefix` is the non-secret leading segment of the opaque token
    /// (`vq_{tenant-hex}_`), used to narrow the lookup before hash comparison.
    async fn get_by_prefix(&self, tenant_id: Id, prefix: &str) -> Result<Vec<ApiKey>, QueueError>;
    async fn list_by_tenant(&self, tenant_id: Id) -> Result<Vec<ApiKey>, QueueError>;
    async fn add(&self, key: &ApiKey) -> Result<ApiKey, QueueError>;
    async fn revoke(&self, tenant_id: Id, api_key_id: Id) -> Result<(), QueueError>;
}
