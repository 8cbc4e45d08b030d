mod delivery_repository;
mod logging_sink;
mod webhook_poster;
mod webhook_repository;

pub use delivery_repository::PgDeliveryRepository;
pub use logging_sink::LoggingNotificationSink;
pub use webhook_poster::ReqwestWebhookPoster;
pub use webhook_repository::PgWebhookRepository;
