use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tokio::time::Instant;

use super::CacheConfig;
use crate::error::CacheError;
use crate::types::CompletionResult;

/// A stored completion.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: CompletionResult,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(result: CompletionResult, ttl: Duration) -> Self {
        Self {
            result,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Key/value store behind [`CachingProvider`](super::CachingProvider).
///
/// Errors are reported, never acted on: the caching layer logs them and
/// carries on as if the entry were absent.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn insert(&self, key: String, entry: CacheEntry) -> Result<(), CacheError>;

    /// Drop expired entries now rather than lazily.
    async fn sweep(&self) -> Result<(), CacheError>;
}

/// In-process LRU + TTL store.
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Approximate number of live entries (moka updates this lazily).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.cache.get(key).await)
    }

    async fn insert(&self, key: String, entry: CacheEntry) -> Result<(), CacheError> {
        self.cache.insert(key, entry).await;
        Ok(())
    }

    async fn sweep(&self) -> Result<(), CacheError> {
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cache_roundtrip() {
        let cache = MemoryCache::new(&CacheConfig::new());
        let entry = CacheEntry::new(CompletionResult::new("hi", "mock"), Duration::from_secs(60));
        cache.insert("k".into(), entry).await.unwrap();

        let got = cache.get("k").await.unwrap().expect("entry present");
        assert_eq!(got.result.text, "hi");
        assert!(cache.get("other").await.unwrap().is_none());

        cache.sweep().await.unwrap();
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expiry_follows_ttl() {
        let entry = CacheEntry::new(CompletionResult::new("hi", "mock"), Duration::from_secs(10));
        assert!(!entry.is_expired());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(entry.is_expired());
    }
}
