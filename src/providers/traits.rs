//! The completion provider capability.
//!
//! Every text-generation backend (hosted APIs, local inference) implements
//! [`CompletionProvider`]. Decorators implement it too, which is how the
//! chain is assembled:
//!
//! ```text
//! ResilientProvider ──► CachingProvider ──► OpenAiClient / AnthropicClient / OllamaClient
//!  retry, breaker,       fingerprint,        wire protocol,
//!  fallback              collapse, TTL       status mapping
//! ```
//!
//! # Error contract
//!
//! Implementations report failures only through the closed
//! [`ProviderError`](crate::ProviderError) set. The resilience wrapper decides
//! what to do with each variant; adapters never retry on their own.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::{CompletionRequest, CompletionResult, Deadline};

/// A backing text-generation service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging and health reporting.
    fn name(&self) -> &str;

    /// Generate text for `request`, giving up when `deadline` passes.
    async fn complete(
        &self,
        request: &CompletionRequest,
        deadline: &Deadline,
    ) -> ProviderResult<CompletionResult>;
}

