use async_trait::async_trait;
use queue_manager_core::domains::notification::model::NotificationChannel;
use queue_manager_core::domains::notification::sink::{NotificationSink, SinkResponse};

/// Opaque channel sink (spec.md §4.10 names email/SMS/WhatsApp as "external
/// collaborators specified only by a send contract"; the transport itself
/// is out of scope). Logs the attempt and reports it accepted.
pub struct LoggingNotificationSink {
    channel: NotificationChannel,
}

impl LoggingNotificationSink {
    pub fn new(channel: NotificationChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn send(&self, to: &str, subject: Option<&str>, body: &str) -> SinkResponse {
        tracing::info!(channel = ?self.channel, to, subject, body, "dispatching notification");
        SinkResponse { accepted: true, error: None }
    }
}
