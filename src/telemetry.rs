//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (prometheus, statsd, ...);
//! without one installed every metric call is a no-op.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `nomadic_`. Counters end in `_total`,
//! histograms carry their unit (`_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name (e.g. "openai", "ollama")
//! - `operation`: template name of the use case (e.g. "summarize_entries")
//! - `status`: outcome: "ok" or "error"
//! - `direction`: token direction: "prompt" or "completion"

/// Provider calls that reached the network (one per attempt).
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "nomadic_requests_total";

/// Provider call duration in seconds.
///
/// Labels: `provider`.
pub const REQUEST_DURATION_SECONDS: &str = "nomadic_request_duration_seconds";

/// Retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "nomadic_retries_total";

/// Tokens consumed, when the provider reports usage.
///
/// Labels: `provider`, `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "nomadic_tokens_total";

/// Completions served from the response cache.
pub const CACHE_HITS_TOTAL: &str = "nomadic_cache_hits_total";

/// Completions that had to go to the provider.
pub const CACHE_MISSES_TOTAL: &str = "nomadic_cache_misses_total";

/// Calls that resolved to a locally computed degraded result.
///
/// Labels: `operation`.
pub const FALLBACKS_TOTAL: &str = "nomadic_fallbacks_total";

/// Circuit breaker transitions into the open state.
///
/// Labels: `provider`.
pub const CIRCUIT_OPENED_TOTAL: &str = "nomadic_circuit_opened_total";

/// Corrective re-prompts issued after unparseable structured output.
///
/// Labels: `operation`.
pub const CORRECTIVE_REPROMPTS_TOTAL: &str = "nomadic_corrective_reprompts_total";
