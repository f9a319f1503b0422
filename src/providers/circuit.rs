//! Per-provider circuit breaker.
//!
//! `Closed → Open` after `failure_threshold` consecutive failures inside the
//! sliding `window`. While open every call fails fast. Once `cooldown` has
//! passed the breaker is `HalfOpen` and admits exactly one probe: success
//! closes the circuit, failure re-opens it.
//!
//! Callers ask for a [`Permit`] before each attempt and settle it with the
//! outcome. A permit dropped without being settled (cancelled call) frees
//! the half-open probe slot so the next caller can probe instead.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use crate::error::ProviderError;
use crate::telemetry;
use crate::types::{CircuitState, ProviderHealth};

/// Circuit breaker thresholds.
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Consecutive failures that open the circuit. Default: 5.
    pub failure_threshold: u32,
    /// Failures older than this no longer count. Default: 60s.
    pub window: Duration,
    /// How long an open circuit fails fast. Default: 30s.
    pub cooldown: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

impl CircuitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero is treated as one.
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n.max(1);
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { since: Instant },
    HalfOpen { probing: bool },
}

#[derive(Debug)]
struct BreakerState {
    phase: Phase,
    /// Timestamps of consecutive failures, oldest first.
    failures: VecDeque<Instant>,
}

impl BreakerState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.failures.front() {
            if now.duration_since(oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}

pub struct CircuitBreaker {
    provider: String,
    config: CircuitConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(provider: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            provider: provider.into(),
            config,
            state: Mutex::new(BreakerState {
                phase: Phase::Closed,
                failures: VecDeque::new(),
            }),
        }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    // A panic while holding the lock leaves the state consistent (every
    // mutation is a single assignment), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ask to make one call. `None` means the circuit is open (or a
    /// half-open probe is already in flight) and the caller must fail fast.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();
        match state.phase {
            Phase::Closed => Some(Permit::new(self, false)),
            Phase::Open { since } => {
                if since.elapsed() < self.config.cooldown {
                    return None;
                }
                info!(provider = %self.provider, "circuit half-open, admitting probe");
                state.phase = Phase::HalfOpen { probing: true };
                Some(Permit::new(self, true))
            }
            Phase::HalfOpen { probing: true } => None,
            Phase::HalfOpen { probing: false } => {
                state.phase = Phase::HalfOpen { probing: true };
                Some(Permit::new(self, true))
            }
        }
    }

    /// Current state, with an expired cool-down reported as half-open.
    pub fn state(&self) -> CircuitState {
        let state = self.lock();
        match state.phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { since } if since.elapsed() < self.config.cooldown => CircuitState::Open,
            Phase::Open { .. } | Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn health(&self) -> ProviderHealth {
        let mut state = self.lock();
        let now = Instant::now();
        state.prune(now, self.config.window);
        let (circuit, open_for) = match state.phase {
            Phase::Closed => (CircuitState::Closed, None),
            Phase::Open { since } => {
                let open_for = now.duration_since(since);
                if open_for < self.config.cooldown {
                    (CircuitState::Open, Some(open_for))
                } else {
                    (CircuitState::HalfOpen, Some(open_for))
                }
            }
            Phase::HalfOpen { .. } => (CircuitState::HalfOpen, None),
        };
        ProviderHealth {
            provider: self.provider.clone(),
            state: circuit,
            consecutive_failures: state.failures.len() as u32,
            open_for,
        }
    }

    fn on_success(&self, probe: bool) {
        let mut state = self.lock();
        state.failures.clear();
        if probe || !matches!(state.phase, Phase::Closed) {
            info!(provider = %self.provider, "circuit closed");
        }
        state.phase = Phase::Closed;
    }

    fn on_failure(&self, probe: bool) {
        let mut state = self.lock();
        let now = Instant::now();
        state.failures.push_back(now);
        state.prune(now, self.config.window);

        let trip = if probe {
            true
        } else {
            matches!(state.phase, Phase::Closed)
                && state.failures.len() as u32 >= self.config.failure_threshold
        };
        if trip {
            state.phase = Phase::Open { since: now };
            error!(
                provider = %self.provider,
                failures = state.failures.len(),
                cooldown_ms = self.config.cooldown.as_millis() as u64,
                "circuit opened"
            );
            metrics::counter!(telemetry::CIRCUIT_OPENED_TOTAL,
                "provider" => self.provider.clone(),
            )
            .increment(1);
        }
    }

    fn release_probe(&self) {
        let mut state = self.lock();
        if let Phase::HalfOpen { probing: true } = state.phase {
            state.phase = Phase::HalfOpen { probing: false };
        }
    }
}

/// Permission to make one call through a [`CircuitBreaker`].
#[must_use = "a permit must be settled with the call outcome"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    /// Whether this is the single half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn succeeded(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    /// Record a failed call. Errors that say nothing about the provider's
    /// health leave the breaker untouched.
    pub fn failed(mut self, err: &ProviderError) {
        if err.counts_as_failure() {
            self.settled = true;
            self.breaker.on_failure(self.probe);
        }
        // Unsettled: Drop hands the probe slot back.
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitConfig::new()
                .failure_threshold(threshold)
                .window(Duration::from_secs(60))
                .cooldown(Duration::from_secs(10)),
        )
    }

    fn fail(b: &CircuitBreaker) {
        b.try_acquire()
            .expect("circuit should admit")
            .failed(&ProviderError::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold() {
        let b = breaker(3);
        fail(&b);
        fail(&b);
        assert_eq!(b.state(), CircuitState::Closed);
        fail(&b);
        assert_eq!(b.state(), CircuitState::Open);
        assert!(b.try_acquire().is_none());
        assert_eq!(b.health().consecutive_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_consecutive_count() {
        let b = breaker(2);
        fail(&b);
        b.try_acquire().expect("admit").succeeded();
        fail(&b);
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_outside_window_are_forgotten() {
        let b = breaker(2);
        fail(&b);
        tokio::time::advance(Duration::from_secs(61)).await;
        fail(&b);
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_request_does_not_count() {
        let b = breaker(1);
        b.try_acquire()
            .expect("admit")
            .failed(&ProviderError::InvalidRequest("bad".into()));
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_admits_single_probe() {
        let b = breaker(1);
        fail(&b);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(b.state(), CircuitState::HalfOpen);

        let probe = b.try_acquire().expect("probe admitted");
        assert!(probe.is_probe());
        assert!(b.try_acquire().is_none());

        probe.succeeded();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens() {
        let b = breaker(1);
        fail(&b);
        tokio::time::advance(Duration::from_secs(10)).await;
        b.try_acquire()
            .expect("probe admitted")
            .failed(&ProviderError::ProviderUnavailable("down".into()));
        assert_eq!(b.state(), CircuitState::Open);
        assert!(b.health().open_for.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_probe_frees_slot() {
        let b = breaker(1);
        fail(&b);
        tokio::time::advance(Duration::from_secs(10)).await;
        drop(b.try_acquire().expect("probe admitted"));
        assert!(b.try_acquire().is_some());
    }
}
