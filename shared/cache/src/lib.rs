//! TTL'd key/value cache used for position hints, permission memoization,
//! rate-limit windows and the JWT blacklist (spec.md §4.3).
//!
//! The trait is kept byte-oriented so it stays object-safe (`Arc<dyn KvCache>`);
//! [`CacheExt`] layers a versioned JSON envelope on top for typed callers. A
//! decode failure is treated as a cache miss rather than an error, matching
//! spec.md §4.3 ("decode errors surface as cache miss").

pub mod keys;
mod memory;
mod redis_backed;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use shared_error::QueueError;
use std::time::Duration;

pub use memory::InMemoryKvCache;
pub use redis_backed::RedisKvCache;

/// Default TTL applied by [`CacheExt::set_json`] when the caller doesn't pick one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

const ENVELOPE_VERSION: u8 = 1;

#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, QueueError>;

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), QueueError>;

    async fn remove(&self, key: &str) -> Result<(), QueueError>;

    async fn exists(&self, key: &str) -> Result<bool, QueueError>;

    /// Atomically increment the integer stored at `key`, creating it at `1`
    /// with `ttl` if absent. Used for rate-limit window counters.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, QueueError>;

    /// Remove every key matching a `*`-glob pattern. Returns the count removed.
    async fn remove_by_pattern(&self, pattern: &str) -> Result<u64, QueueError>;
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
    v: u8,
    data: T,
}

/// Typed convenience layer over any [`KvCache`], including `Arc<dyn KvCache>`.
#[async_trait]
pub trait CacheExt: KvCache {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, key, "cache read failed, treating as miss");
                return None;
            },
        };
        match serde_json::from_slice::<Envelope<T>>(&raw) {
            Ok(env) if env.v == ENVELOPE_VERSION => Some(env.data),
            Ok(_) => {
                tracing::warn!(key, "cache entry has unsupported envelope version");
                None
            },
            Err(e) => {
                tracing::warn!(error = %e, key, "cache entry failed to decode");
                None
            },
        }
    }

    async fn set_json<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), QueueError> {
        let envelope = Envelope { v: ENVELOPE_VERSION, data: value };
        let raw = serde_json::to_vec(&envelope)
            .map_err(|e| QueueError::invalid_argument(format!("cache encode failed: {e}")))?;
        self.set_raw(key, raw, Some(ttl.unwrap_or(DEFAULT_TTL))).await
    }
}

impl<C: KvCache + ?Sized> CacheExt for C {}
