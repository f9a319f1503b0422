//! Caller-supplied deadline and cancellation.
//!
//! A [`Deadline`] travels down the provider chain (resilience wrapper →
//! cache → adapter). Every wait point races against it: when the instant
//! passes or the cancellation token fires, the in-flight future is dropped
//! and [`ProviderError::Timeout`] is reported.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, ProviderResult};

#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    cancel: Option<CancellationToken>,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    /// Deadline at an absolute instant.
    pub fn at(at: Instant) -> Self {
        Self { at, cancel: None }
    }

    /// Also stop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed or the call was cancelled.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at || self.is_cancelled()
    }

    /// Whether the caller cancelled, as opposed to the clock running out.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Whether waiting `delay` would run past the deadline.
    pub fn would_overrun(&self, delay: Duration) -> bool {
        Instant::now() + delay >= self.at
    }

    /// Run `fut` to completion unless the deadline or cancellation fires first.
    pub async fn run<F, T>(&self, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = T>,
    {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ProviderError::Timeout),
                res = tokio::time::timeout_at(self.at, fut) => res.map_err(|_| ProviderError::Timeout),
            },
            None => tokio::time::timeout_at(self.at, fut)
                .await
                .map_err(|_| ProviderError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn run_completes_before_deadline() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let out = deadline.run(async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn run_times_out() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let out = deadline
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(out, Err(ProviderError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_reports_timeout() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(Duration::from_secs(60)).with_cancellation(token.clone());
        token.cancel();
        assert!(deadline.is_expired());
        let out = deadline
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(out, Err(ProviderError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn would_overrun_checks_remaining_time() {
        let deadline = Deadline::after(Duration::from_millis(100));
        assert!(!deadline.would_overrun(Duration::from_millis(10)));
        assert!(deadline.would_overrun(Duration::from_millis(200)));
    }
}
