//! Error types for the journal LLM layer.
//!
//! Providers speak a small closed vocabulary ([`ProviderError`]) so the
//! resilience wrapper can apply one policy regardless of which backend sits
//! behind it. Everything else a caller can see is a [`NomadicError`].

use std::time::Duration;

/// Failures a [`CompletionProvider`](crate::providers::CompletionProvider) may report.
///
/// The set is closed on purpose: adapters map their wire-level failures
/// onto these variants and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider rejected credentials")]
    Unauthorized,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider call timed out")]
    Timeout,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("unknown provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Whether the resilience wrapper may try the call again.
    ///
    /// `Unauthorized` and `InvalidRequest` can never succeed on retry.
    /// `Unknown` is not retried either since nothing says it is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Timeout
                | ProviderError::ProviderUnavailable(_)
        )
    }

    /// Provider-suggested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this failure should count against the provider's health.
    ///
    /// A malformed request is the caller's fault, not the provider's.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, ProviderError::InvalidRequest(_))
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Unauthorized => "unauthorized",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Timeout => "timeout",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::ProviderUnavailable(_) => "unavailable",
            ProviderError::Unknown(_) => "unknown",
        }
    }
}

/// Template lookup and rendering failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("cannot render template '{template}': placeholder '{placeholder}' {reason}")]
    Render {
        template: String,
        placeholder: String,
        reason: String,
    },

    #[error("invalid template data for '{template}': {reason}")]
    InvalidData { template: String, reason: String },

    #[error("failed to load templates: {0}")]
    Load(String),
}

/// Storage failure inside a cache backend. Never fatal to a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cache backend error: {0}")]
pub struct CacheError(pub String);

/// Crate-level error type.
#[derive(Debug, thiserror::Error)]
pub enum NomadicError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Structured output could not be parsed into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no provider configured")]
    NoProvider,
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, NomadicError>;

/// Result type alias for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
