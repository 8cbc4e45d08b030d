//! Redis-backed cache, for deployments sharing state across instances.
//!
//! Connection handling follows `shared_rate_limit::RedisRateLimiter`: a
//! `ConnectionManager` behind an `Arc`, cloned per call.

use crate::KvCache;
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use shared_error::QueueError;
use std::time::Duration;

#[derive(Clone)]
pub struct RedisKvCache {
    connection: ConnectionManager,
}

impl RedisKvCache {
    pub async fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::transient(format!("invalid redis url: {e}")))?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl KvCache for RedisKvCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, QueueError> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
            },
            None => {
                let _: () = conn.set(key, value).await?;
            },
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, QueueError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, QueueError> {
        let mut conn = self.connection.clone();
        let next: i64 = conn.incr(key, 1).await?;
        if next == 1 {
            let _: () = conn.expire(key, ttl.as_secs().max(1) as i64).await?;
        }
        Ok(next)
    }

    async fn remove_by_pattern(&self, pattern: &str) -> Result<u64, QueueError> {
        let mut scan_conn = self.connection.clone();
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<'_, String> = scan_conn.scan_match(pattern).await?;
            while let Some(key) = iter.next().await {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(&keys).await?;
        Ok(removed)
    }
}
