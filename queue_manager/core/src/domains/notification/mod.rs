pub mod model;
pub mod repository;
pub mod sink;

pub use model::{NotificationChannel, NotificationEvent, Webhook, WebhookDelivery};
pub use repository::{DeliveryRepository, WebhookRepository};
pub use sink::{NotificationFanout, NotificationSink, SinkResponse};
