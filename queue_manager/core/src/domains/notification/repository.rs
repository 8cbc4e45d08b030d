use super::model::{Webhook, WebhookDelivery};
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::Id;

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn get_by_id(&self, tenant_id: Id, webhook_id: Id) -> Result<Option<Webhook>, QueueError>;
    async fn list_by_tenant(&self, tenant_id: Id) -> Result<Vec<Webhook>, QueueError>;
    /// Resolves every active subscriber across tenants matching `kind`; the
    /// fan-out then filters to the event's own tenant at dispatch time.
    async fn list_subscribed(&self, tenant_id: Id, kind: shared_events::EventKind) -> Result<Vec<Webhook>, QueueError>;
    async fn add(&self, webhook: &Webhook) -> Result<Webhook, QueueError>;
    async fn soft_delete(&self, tenant_id: Id, webhook_id: Id) -> Result<(), QueueError>;
}

#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn record(&self, delivery: &WebhookDelivery) -> Result<(), QueueError>;
    async fn list_by_webhook(&self, tenant_id: Id, webhook_id: Id) -> Result<Vec<WebhookDelivery>, QueueError>;
    async fn get_by_id(&self, tenant_id: Id, delivery_id: Id) -> Result<Option<WebhookDelivery>, QueueError>;
}
