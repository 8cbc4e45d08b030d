//! Fixed-window rate limiting (spec.md §4.6), built directly on
//! [`shared_cache`] rather than duplicating an in-memory/Redis split the way
//! `shared_rate_limit::{InMemoryRateLimiter, RedisRateLimiter}` did — the
//! cache already has that split, so the limiter only needs one algorithm on
//! top of it. Every check fails open on a cache error: a denial must never
//! be caused by infrastructure outage.

mod result;

pub use result::RateLimitResult;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared_cache::{keys, CacheExt, KvCache};
use shared_error::QueueError;
use std::sync::Arc;
use std::time::Duration;

/// A persisted per-key override of the default `{limit, window}`, set via
/// [`RateLimiter::set`] (spec.md §4.6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Override {
    limit: u32,
    window_secs: u64,
}

pub struct RateLimiter {
    cache: Arc<dyn KvCache>,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn KvCache>) -> Self {
        Self { cache }
    }

    /// Check-and-increment `key`'s fixed window counter. `limit`/`window` are
    /// the endpoint's default, overridden by a prior [`RateLimiter::set`] for
    /// this key if one exists. Never returns an error: on cache failure it
    /// logs a warning and allows the request (spec.md §4.6, "Fail-open").
    pub async fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitResult {
        match self.try_check(key, limit, window).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, key, "rate limiter cache error, failing open");
                RateLimitResult::fail_open(limit)
            },
        }
    }

    async fn try_check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateLimitResult, QueueError> {
        let (limit, window) = match self.cache.get_json::<Override>(&keys::rate_limit_override(key)).await {
            Some(o) => (o.limit, Duration::from_secs(o.window_secs)),
            None => (limit, window),
        };

        let now = Utc::now().timestamp();
        let window_secs = window.as_secs() as i64;
        let window_start_key = keys::rate_limit_window_start(key);
        let count_key = keys::rate_limit_count(key);

        // `incr` creates the counter at 1 with `window` as its TTL, so the
        // key itself expiring is what rolls the window over; this makes the
        // increment atomic across concurrent requests on the same key.
        let count = self.cache.incr(&count_key, window).await?;
        let reset_at = if count == 1 {
            self.cache.set_json(&window_start_key, &now, Some(window)).await?;
            now + window_secs
        } else {
            let start: i64 = self.cache.get_json(&window_start_key).await.unwrap_or(now);
            start + window_secs
        };

        if count > limit as i64 {
            return Ok(RateLimitResult { allowed: false, remaining: 0, reset_at });
        }
        Ok(RateLimitResult {
            allowed: true,
            remaining: limit.saturating_sub(count as u32),
            reset_at,
        })
    }

    /// Administrative override: clear `key`'s window immediately.
    pub async fn reset(&self, key: &str) -> Result<(), QueueError> {
        let window_start_key = keys::rate_limit_window_start(key);
        let count_key = keys::rate_limit_count(key);
        self.cache.remove(&window_start_key).await?;
        self.cache.remove(&count_key).await?;
        Ok(())
    }

    /// Administrative override: persist `{limit, window}` for `key`, taking
    /// precedence over the endpoint default on every subsequent `check`.
    /// Stored with a year-long TTL since [`KvCache`] entries are always
    /// expiring (spec.md §4.6 `set(key, N, W)`). Does not itself reset an
    /// in-progress window; combine with [`RateLimiter::reset`] to apply
    /// immediately.
    pub async fn set(&self, key: &str, limit: u32, window: Duration) -> Result<(), QueueError> {
        const OVERRIDE_TTL: Duration = Duration::from_secs(365 * 24 * 3600);
        let override_ = Override { limit, window_secs: window.as_secs() };
        self.cache.set_json(&keys::rate_limit_override(key), &override_, Some(OVERRIDE_TTL)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_cache::InMemoryKvCache;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(InMemoryKvCache::new()))
    }

    #[tokio::test]
    async fn allows_up_to_the_limit_then_denies() {
        let rl = limiter();
        let window = Duration::from_secs(60);
        for i in 0..5 {
            let r = rl.check("ep:login:ip1", 5, window).await;
            assert!(r.allowed, "request {i} should be allowed");
        }
        let denied = rl.check("ep:login:ip1", 5, window).await;
        assert!(!denied.allowed);
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let rl = limiter();
        let window = Duration::from_secs(60);
        for _ in 0..3 {
            rl.check("key1", 3, window).await;
        }
        assert!(!rl.check("key1", 3, window).await.allowed);
        assert!(rl.check("key2", 3, window).await.allowed);
    }

    #[tokio::test]
    async fn reset_clears_the_window() {
        let rl = limiter();
        let window = Duration::from_secs(60);
        for _ in 0..3 {
            rl.check("key", 3, window).await;
        }
        assert!(!rl.check("key", 3, window).await.allowed);

        rl.reset("key").await.unwrap();
        assert!(rl.check("key", 3, window).await.allowed);
    }

    #[tokio::test]
    async fn window_resets_only_after_full_duration() {
        let rl = limiter();
        let window = Duration::from_secs(1);
        for _ in 0..2 {
            rl.check("key", 2, window).await;
        }
        assert!(!rl.check("key", 2, window).await.allowed);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!rl.check("key", 2, window).await.allowed, "window has not elapsed yet");

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(rl.check("key", 2, window).await.allowed, "window has elapsed");
    }

    #[tokio::test]
    async fn set_overrides_the_default_limit_for_that_key() {
        let rl = limiter();
        rl.set("key", 1, Duration::from_secs(60)).await.unwrap();

        assert!(rl.check("key", 100, Duration::from_secs(60)).await.allowed);
        let denied = rl.check("key", 100, Duration::from_secs(60)).await;
        assert!(!denied.allowed, "the per-key override of 1 should win over the default of 100");
    }

    #[tokio::test]
    async fn set_does_not_affect_other_keys() {
        let rl = limiter();
        rl.set("key1", 1, Duration::from_secs(60)).await.unwrap();

        assert!(rl.check("key2", 5, Duration::from_secs(60)).await.allowed);
    }
}
