//! Retry, circuit breaking and fallback around a provider.
//!
//! Each call moves through `Attempting → Success`, `Attempting → Retrying →
//! Attempting`, or `Attempting → Fallback`. Only [`ProviderError::is_retryable`]
//! errors are retried, the breaker is consulted before every attempt, and
//! every wait (the attempt itself and the backoff) races the caller's
//! [`Deadline`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::circuit::{CircuitBreaker, CircuitConfig};
use super::retry::RetryConfig;
use super::traits::CompletionProvider;
use crate::error::{ProviderError, ProviderResult};
use crate::telemetry;
use crate::types::{CompletionRequest, CompletionResult, Deadline, ProviderHealth};

/// Result of [`ResilientProvider::complete_or_fallback`].
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// The provider answered.
    Native(CompletionResult),
    /// The provider could not answer; `value` came from the fallback.
    Degraded { value: T, cause: ProviderError },
}

impl<T> Outcome<T> {
    pub fn is_native(&self) -> bool {
        matches!(self, Outcome::Native(_))
    }
}

/// Decorator that owns the retry policy and the circuit breaker for one
/// provider chain.
pub struct ResilientProvider {
    inner: Arc<dyn CompletionProvider>,
    retry: RetryConfig,
    breaker: CircuitBreaker,
}

impl ResilientProvider {
    pub fn new(
        inner: Arc<dyn CompletionProvider>,
        retry: RetryConfig,
        circuit: CircuitConfig,
    ) -> Self {
        let breaker = CircuitBreaker::new(inner.name(), circuit);
        Self {
            inner,
            retry,
            breaker,
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn health(&self) -> ProviderHealth {
        self.breaker.health()
    }

    /// Like [`complete`](CompletionProvider::complete), but resolve failures
    /// through `fallback`.
    ///
    /// `fallback` runs exactly once when retries are exhausted, on a
    /// non-retryable error, or when the circuit is open (no network call is
    /// made in that case). If it returns `None` the provider error is
    /// returned instead.
    pub async fn complete_or_fallback<T, F>(
        &self,
        request: &CompletionRequest,
        deadline: &Deadline,
        fallback: F,
    ) -> ProviderResult<Outcome<T>>
    where
        F: FnOnce(&ProviderError) -> Option<T>,
    {
        match self.attempt(request, deadline).await {
            Ok(result) => Ok(Outcome::Native(result)),
            Err(cause) => match fallback(&cause) {
                Some(value) => {
                    let operation = request
                        .template
                        .as_ref()
                        .map(|t| t.name.clone())
                        .unwrap_or_else(|| "adhoc".to_string());
                    warn!(
                        provider = self.inner.name(),
                        operation = %operation,
                        error = %cause,
                        "serving degraded result"
                    );
                    metrics::counter!(telemetry::FALLBACKS_TOTAL,
                        "operation" => operation,
                    )
                    .increment(1);
                    Ok(Outcome::Degraded { value, cause })
                }
                None => Err(cause),
            },
        }
    }

    async fn attempt(
        &self,
        request: &CompletionRequest,
        deadline: &Deadline,
    ) -> ProviderResult<CompletionResult> {
        let provider = self.inner.name();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let Some(permit) = self.breaker.try_acquire() else {
                debug!(provider, "circuit open, failing fast");
                return Err(ProviderError::ProviderUnavailable(format!(
                    "circuit open for {provider}"
                )));
            };
            if deadline.is_expired() {
                return Err(ProviderError::Timeout);
            }

            let err = match deadline
                .run(self.inner.complete(request, deadline))
                .await
                .and_then(|inner| inner)
            {
                // A cache hit says nothing about the provider; only a live
                // answer may settle the permit.
                Ok(result) if result.cached => {
                    drop(permit);
                    return Ok(result);
                }
                Ok(result) => {
                    permit.succeeded();
                    return Ok(result);
                }
                // Caller walked away; says nothing about the provider.
                Err(_) if deadline.is_cancelled() => {
                    drop(permit);
                    return Err(ProviderError::Timeout);
                }
                Err(err) => {
                    permit.failed(&err);
                    err
                }
            };

            attempt += 1;
            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let delay = self.retry.effective_delay(attempt - 1, err.retry_after());
            if deadline.would_overrun(delay) {
                debug!(
                    provider,
                    delay_ms = delay.as_millis() as u64,
                    "backoff would overrun deadline"
                );
                return Err(ProviderError::Timeout);
            }

            metrics::counter!(telemetry::RETRIES_TOTAL,
                "provider" => provider.to_owned(),
            )
            .increment(1);
            warn!(
                provider,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after transient error"
            );
            deadline.run(tokio::time::sleep(delay)).await?;
        }
    }
}

#[async_trait]
impl CompletionProvider for ResilientProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    /// Retries and circuit breaking without fallback. An open circuit is
    /// reported as [`ProviderError::ProviderUnavailable`].
    async fn complete(
        &self,
        request: &CompletionRequest,
        deadline: &Deadline,
    ) -> ProviderResult<CompletionResult> {
        self.attempt(request, deadline).await
    }
}
