//! Response cache for completions.
//!
//! [`CachingProvider`] wraps a [`CompletionProvider`](crate::providers::CompletionProvider)
//! and serves repeated requests from a [`CacheBackend`] without touching the
//! network. Entries are keyed on a SHA-256 [`fingerprint`] of the template
//! tag, rendered prompt and generation parameters, and are committed only
//! after the provider succeeds.
//!
//! # Request collapsing
//!
//! Concurrent identical requests share one provider call: the first caller
//! for a key takes a per-key lock and calls the provider, the others wait on
//! the lock (bounded by their own deadline) and then read what the first one
//! committed. If the first caller fails or is cancelled nothing is written
//! and the next waiter makes its own call.
//!
//! # Backends
//!
//! [`MemoryCache`] is a moka LRU + TTL store owned by the process. Backend
//! failures never fail a call: reads degrade to a miss and writes are
//! dropped, both with a warning.

mod backend;
mod key;
mod provider;

use std::time::Duration;

pub use backend::{CacheBackend, CacheEntry, MemoryCache};
pub use key::fingerprint;
pub use provider::CachingProvider;

/// Configuration for the response cache.
///
/// ```rust
/// # use nomadic_llm::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether the chain includes a cache at all. Default: true.
    pub enabled: bool,
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 24 hours.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}
