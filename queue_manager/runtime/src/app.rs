//! Service graph construction: one concrete implementation wired behind
//! each core trait, the way the teacher's `AppState` assembles a service
//! struct from its repositories before handing it to handlers. There's no
//! HTTP surface here (spec.md §1 Non-goals), so this is consumed directly
//! by the releaser and retention background tasks instead of a router.

use queue_manager_core::domains::queue::{QueueEngine, QueueEngineConfig};
use queue_manager_core::domains::retention::RetentionService;
use queue_manager_infra::identity::{BcryptAuthService, PgApiKeyRepository, PgUserRepository};
use queue_manager_infra::notification::{
    LoggingNotificationSink, PgDeliveryRepository, PgWebhookRepository, ReqwestWebhookPoster,
};
use queue_manager_infra::queue::{PgQueueRepository, PgSessionRepository};
use queue_manager_infra::retention::{OpaqueColdStorageArchiver, PgBackupRepository, PgRetentionPolicyRepository};
use queue_manager_infra::tenant::PgTenantRepository;
use shared_auth::Authorizer;
use shared_cache::{KvCache, RedisKvCache};
use shared_config::Config;
use shared_events::EventBus;
use shared_rate_limit::RateLimiter;
use sqlx::PgPool;
use std::sync::Arc;

pub type AuthServiceImpl = BcryptAuthService<PgUserRepository, PgApiKeyRepository>;

/// Everything the background tasks and (a future) API layer need, built
/// once at startup and shared behind `Arc`.
pub struct App {
    pub config: Config,
    pub db: PgPool,
    pub cache: Arc<dyn KvCache>,
    pub events: Arc<EventBus>,
    pub tenants: Arc<PgTenantRepository>,
    pub queues: Arc<PgQueueRepository>,
    pub sessions: Arc<PgSessionRepository>,
    pub queue_engine: Arc<QueueEngine>,
    pub auth: Arc<AuthServiceImpl>,
    pub authorizer: Arc<Authorizer>,
    pub rate_limiter: Arc<RateLimiter>,
    pub retention: Arc<RetentionService>,
}

impl App {
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let db = shared_db::init_pool(&config.database_url, 10).await?;
        tracing::info!("durable store connected");

        let cache: Arc<dyn KvCache> = Arc::new(RedisKvCache::new(&config.redis_url).await?);
        tracing::info!("cache connected");

        let events = Arc::new(EventBus::new());

        let tenants = Arc::new(PgTenantRepository::new(db.clone()));
        let queues = Arc::new(PgQueueRepository::new(db.clone()));
        let sessions = Arc::new(PgSessionRepository::new(db.clone()));
        let users = PgUserRepository::new(db.clone());
        let api_keys = PgApiKeyRepository::new(db.clone());
        let webhooks = Arc::new(PgWebhookRepository::new(db.clone()));
        let deliveries = Arc::new(PgDeliveryRepository::new(db.clone()));
        let retention_policies = Arc::new(PgRetentionPolicyRepository::new(db.clone()));
        let backups = Arc::new(PgBackupRepository::new(db.clone()));

        let queue_engine = Arc::new(QueueEngine::new(
            queues.clone(),
            sessions.clone(),
            cache.clone(),
            events.clone(),
            QueueEngineConfig { strict_capacity_mode: config.strict_capacity_mode },
        ));

        let auth = Arc::new(BcryptAuthService::new(
            users,
            api_keys,
            cache.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiration,
            config.jwt_refresh_expiration,
        ));

        let authorizer = Arc::new(Authorizer::new(cache.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(cache.clone()));

        let poster = Arc::new(ReqwestWebhookPoster::new());
        let channel_sinks: Vec<_> = [
            queue_manager_core::domains::notification::NotificationChannel::Email,
            queue_manager_core::domains::notification::NotificationChannel::Sms,
        ]
        .into_iter()
        .map(|channel| Arc::new(LoggingNotificationSink::new(channel)) as Arc<dyn queue_manager_core::domains::notification::NotificationSink>)
        .collect();
        let fanout = Arc::new(queue_manager_core::domains::notification::NotificationFanout::new(
            webhooks, deliveries, poster, channel_sinks,
        ));
        events.add_sink(fanout).await;

        let retention = Arc::new(RetentionService::new(retention_policies, Arc::new(OpaqueColdStorageArchiver)));
        let _ = backups; // kept for future backup-verification wiring; not yet driven by a background task.

        Ok(Self {
            config,
            db,
            cache,
            events,
            tenants,
            queues,
            sessions,
            queue_engine,
            auth,
            authorizer,
            rate_limiter,
            retention,
        })
    }
}
