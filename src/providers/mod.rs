//! Completion providers and the decorators that wrap them.
//!
//! - [`traits`]: the [`CompletionProvider`] capability
//! - [`openai`], [`anthropic`], [`ollama`]: backend adapters
//! - [`retry`], [`circuit`], [`resilience`]: the resilience wrapper

pub mod anthropic;
pub mod circuit;
mod http;
pub mod ollama;
pub mod openai;
pub mod resilience;
pub mod retry;
pub mod traits;

pub use anthropic::AnthropicClient;
pub use circuit::{CircuitBreaker, CircuitConfig, Permit};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use resilience::{Outcome, ResilientProvider};
pub use retry::RetryConfig;
pub use traits::CompletionProvider;
