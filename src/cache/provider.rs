use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use super::backend::{CacheBackend, CacheEntry, MemoryCache};
use super::key::fingerprint;
use super::CacheConfig;
use crate::error::ProviderResult;
use crate::providers::CompletionProvider;
use crate::telemetry;
use crate::types::{CompletionRequest, CompletionResult, Deadline};

type KeyLocks = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Decorator that caches successful completions.
pub struct CachingProvider {
    inner: Arc<dyn CompletionProvider>,
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    in_flight: KeyLocks,
}

impl CachingProvider {
    /// Cache in front of `inner` using a [`MemoryCache`] sized by `config`.
    pub fn new(inner: Arc<dyn CompletionProvider>, config: &CacheConfig) -> Self {
        Self::with_backend(inner, Arc::new(MemoryCache::new(config)), config.ttl)
    }

    pub fn with_backend(
        inner: Arc<dyn CompletionProvider>,
        backend: Arc<dyn CacheBackend>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            backend,
            ttl,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Evict expired entries from the backend.
    pub async fn sweep(&self) {
        if let Err(e) = self.backend.sweep().await {
            warn!(error = %e, "cache sweep failed");
        }
    }

    async fn lookup(&self, key: &str) -> Option<CompletionResult> {
        match self.backend.get(key).await {
            Ok(Some(entry)) if !entry.is_expired() => {
                let mut result = entry.result;
                result.cached = true;
                Some(result)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, result: &CompletionResult) {
        let entry = CacheEntry::new(result.clone(), self.ttl);
        if let Err(e) = self.backend.insert(key.to_string(), entry).await {
            warn!(error = %e, "cache write failed, result not cached");
        }
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lease(&self, key: &str) -> KeyLease<'_> {
        let lock = self
            .locks()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        KeyLease {
            owner: self,
            key: key.to_string(),
            lock,
        }
    }
}

/// One caller's claim on a per-key lock. Removes the map entry when the
/// last claimant goes away, including when its future is dropped.
struct KeyLease<'a> {
    owner: &'a CachingProvider,
    key: String,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks();
        // The map holds one reference and this lease the other.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

fn hit(result: CompletionResult, key: &str) -> ProviderResult<CompletionResult> {
    debug!(key = %&key[..12.min(key.len())], provider = %result.provider, "cache hit");
    metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
    Ok(result)
}

#[async_trait]
impl CompletionProvider for CachingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        deadline: &Deadline,
    ) -> ProviderResult<CompletionResult> {
        let key = fingerprint(request);
        if let Some(result) = self.lookup(&key).await {
            return hit(result, &key);
        }

        let lease = self.lease(&key);
        let _guard = deadline.run(lease.lock.lock()).await?;

        // Whoever held the lock before us may have filled the entry.
        if let Some(result) = self.lookup(&key).await {
            return hit(result, &key);
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        let result = self.inner.complete(request, deadline).await?;
        self.store(&key, &result).await;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::{CacheError, ProviderError};
    use crate::types::GenerationParams;

    /// Backend that fails every operation.
    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError("disk on fire".into()))
        }

        async fn insert(&self, _key: String, _entry: CacheEntry) -> Result<(), CacheError> {
            Err(CacheError("disk on fire".into()))
        }

        async fn sweep(&self) -> Result<(), CacheError> {
            Err(CacheError("disk on fire".into()))
        }
    }

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionProvider for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
            _deadline: &Deadline,
        ) -> ProviderResult<CompletionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompletionResult::new(format!("echo: {}", request.prompt), "counting"))
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn broken_backend_is_a_miss_not_an_error() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cache = CachingProvider::with_backend(
            inner.clone(),
            Arc::new(BrokenBackend),
            Duration::from_secs(60),
        );
        let request = CompletionRequest::new("hi", GenerationParams::default());

        assert_eq!(cache.complete(&request, &deadline()).await.unwrap().text, "echo: hi");
        assert_eq!(cache.complete(&request, &deadline()).await.unwrap().text, "echo: hi");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        cache.sweep().await;
    }

    #[tokio::test]
    async fn key_locks_are_released() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cache = CachingProvider::new(inner, &CacheConfig::new());
        let request = CompletionRequest::new("hi", GenerationParams::default());
        cache.complete(&request, &deadline()).await.unwrap();
        assert!(cache.locks().is_empty());
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        struct Flaky {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl CompletionProvider for Flaky {
            fn name(&self) -> &str {
                "flaky"
            }

            async fn complete(
                &self,
                _request: &CompletionRequest,
                _deadline: &Deadline,
            ) -> ProviderResult<CompletionResult> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::ProviderUnavailable("down".into()))
                } else {
                    Ok(CompletionResult::new("recovered", "flaky"))
                }
            }
        }

        let cache = CachingProvider::new(
            Arc::new(Flaky {
                calls: AtomicUsize::new(0),
            }),
            &CacheConfig::new(),
        );
        let request = CompletionRequest::new("hi", GenerationParams::default());
        assert!(cache.complete(&request, &deadline()).await.is_err());
        let second = cache.complete(&request, &deadline()).await.unwrap();
        assert_eq!(second.text, "recovered");
        assert!(!second.cached);
        assert!(cache.complete(&request, &deadline()).await.unwrap().cached);
    }
}
