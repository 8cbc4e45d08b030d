//! In-memory cache backend, suitable for a single instance or tests.
//!
//! Mirrors `shared_rate_limit::InMemoryRateLimiter`'s `Arc<RwLock<HashMap>>`
//! shape: lazy expiry checked on read, periodic sweep on write to bound
//! memory.

use crate::KvCache;
use async_trait::async_trait;
use shared_error::QueueError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Clone)]
pub struct InMemoryKvCache {
    store: Arc<RwLock<HashMap<String, Entry>>>,
    max_entries: usize,
}

impl InMemoryKvCache {
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(HashMap::new())), max_entries: 50_000 }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self { store: Arc::new(RwLock::new(HashMap::new())), max_entries }
    }

    async fn sweep_if_large(&self) {
        let mut store = self.store.write().await;
        if store.len() > self.max_entries {
            store.retain(|_, e| !e.is_expired());
        }
    }
}

impl Default for InMemoryKvCache {
    fn default() -> Self {
        Self::new()
    }
}

fn glob_to_prefix(pattern: &str) -> Option<&str> {
    // Every pattern used by this codebase is `literal*`; a cheap prefix match
    // covers it without pulling in a glob crate for the in-memory backend.
    pattern.strip_suffix('*')
}

#[async_trait]
impl KvCache for InMemoryKvCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, QueueError> {
        let store = self.store.read().await;
        match store.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), QueueError> {
        self.sweep_if_large().await;
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.store.write().await.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), QueueError> {
        self.store.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, QueueError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, QueueError> {
        let mut store = self.store.write().await;
        let entry = store.entry(key.to_string()).or_insert_with(|| Entry {
            value: b"0".to_vec(),
            expires_at: Some(Instant::now() + ttl),
        });
        if entry.is_expired() {
            entry.value = b"0".to_vec();
            entry.expires_at = Some(Instant::now() + ttl);
        }
        let current: i64 = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let next = current + 1;
        entry.value = next.to_string().into_bytes();
        Ok(next)
    }

    async fn remove_by_pattern(&self, pattern: &str) -> Result<u64, QueueError> {
        let prefix = glob_to_prefix(pattern).unwrap_or(pattern);
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|k, _| !k.starts_with(prefix));
        Ok((before - store.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryKvCache::new();
        cache.set_raw("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(cache.get_raw("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn ttl_of_zero_expires_immediately() {
        let cache = InMemoryKvCache::new();
        cache.set_raw("k", b"v".to_vec(), Some(Duration::from_millis(0))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get_raw("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn incr_creates_and_increments() {
        let cache = InMemoryKvCache::new();
        assert_eq!(cache.incr("c", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(cache.incr("c", Duration::from_secs(60)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn remove_by_pattern_matches_prefix() {
        let cache = InMemoryKvCache::new();
        cache.set_raw("permission:t1:u1:a", b"1".to_vec(), None).await.unwrap();
        cache.set_raw("permission:t1:u1:b", b"1".to_vec(), None).await.unwrap();
        cache.set_raw("permission:t2:u2:a", b"1".to_vec(), None).await.unwrap();

        let removed = cache.remove_by_pattern("permission:t1:u1:*").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.exists("permission:t2:u2:a").await.unwrap());
    }
}
