//! Provider health as reported to callers.

use std::time::Duration;

use serde::Serialize;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Failing fast until the cool-down passes.
    Open,
    /// Cool-down passed; one probe call decides.
    HalfOpen,
}

/// Snapshot of a provider's health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub state: CircuitState,
    /// Consecutive failures inside the sliding window.
    pub consecutive_failures: u32,
    /// How long the circuit has been open, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_for: Option<Duration>,
}

impl ProviderHealth {
    pub fn is_healthy(&self) -> bool {
        self.state == CircuitState::Closed
    }
}
