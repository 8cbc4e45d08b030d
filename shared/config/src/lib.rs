use serde::Deserialize;

/// Process configuration loaded from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,

    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: i64,
    #[serde(default = "default_jwt_refresh_expiration")]
    pub jwt_refresh_expiration: i64,

    /// Default for `Queue.strict_capacity_mode` when a tenant doesn't override it.
    /// Left implementer-configurable per spec.md §9 open question.
    #[serde(default = "default_strict_capacity_mode")]
    pub strict_capacity_mode: bool,

    /// Releaser burst ceiling when a queue doesn't set its own `max_burst`.
    #[serde(default = "default_max_burst")]
    pub default_max_burst: u32,

    #[serde(default = "default_webhook_timeout_ms")]
    pub webhook_timeout_ms: u64,
    #[serde(default = "default_notification_timeout_ms")]
    pub notification_timeout_ms: u64,
    #[serde(default = "default_store_query_timeout_ms")]
    pub store_query_timeout_ms: u64,
}

fn default_jwt_expiration() -> i64 {
    900
}

fn default_jwt_refresh_expiration() -> i64 {
    604_800 // 7 days, per spec.md §4.4
}

fn default_strict_capacity_mode() -> bool {
    false
}

fn default_max_burst() -> u32 {
    1
}

fn default_webhook_timeout_ms() -> u64 {
    30_000
}

fn default_notification_timeout_ms() -> u64 {
    5_000
}

fn default_store_query_timeout_ms() -> u64 {
    10_000
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .set_default("database_url", "")?
            .set_default("redis_url", "redis://127.0.0.1:6379")?
            .set_default("jwt_secret", "")?
            .set_default("jwt_expiration", 900)?
            .set_default("jwt_refresh_expiration", 604_800)?
            .set_default("strict_capacity_mode", false)?
            .set_default("default_max_burst", 1)?
            .set_default("webhook_timeout_ms", 30_000)?
            .set_default("notification_timeout_ms", 5_000)?
            .set_default("store_query_timeout_ms", 10_000)?
            .add_source(config::Environment::default());

        builder.build()?.try_deserialize()
    }
}
