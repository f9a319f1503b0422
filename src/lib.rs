//! Nomadic LLM - the language-model layer of the Nomadic travel journal
//!
//! This crate turns journal entries and expenses into prompts, sends them to
//! one of several interchangeable text-generation providers, and hands typed
//! results back to the presentation layer. Provider failures are absorbed by
//! retries, a circuit breaker and locally computed fallbacks; repeated
//! requests are served from a response cache.
//!
//! ```text
//! JournalAnalyst ─► TemplateRegistry ─► ResilientProvider ─► CachingProvider ─► provider
//!   (use cases)       (render, trim)      (retry, breaker)     (fingerprint)     (HTTP)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use nomadic_llm::{JournalAnalyst, JournalEntry, OllamaClient};
//!
//! #[tokio::main]
//! async fn main() -> nomadic_llm::Result<()> {
//!     let analyst = JournalAnalyst::builder()
//!         .provider(Arc::new(OllamaClient::new("llama3.2")))
//!         .build()?;
//!
//!     let entries = vec![
//!         JournalEntry::new(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(), "Fushimi Inari at dawn.")
//!             .location("Kyoto, Japan"),
//!     ];
//!
//!     let summary = analyst.summarize(&entries, &analyst.default_deadline()).await?;
//!     println!("{} ({:?})", summary.value, summary.status);
//!     Ok(())
//! }
//! ```

pub mod analyst;
pub mod cache;
pub mod config;
pub mod error;
pub mod providers;
pub mod telemetry;
pub mod template;
pub mod types;

// Re-export main types at crate root
pub use analyst::{AnalystBuilder, AnalystConfig, JournalAnalyst};
pub use cache::{CacheBackend, CacheConfig, CacheEntry, CachingProvider, MemoryCache};
pub use config::{ProviderKind, Secrets, Settings};
pub use error::{CacheError, NomadicError, ProviderError, ProviderResult, Result, TemplateError};
pub use providers::{
    AnthropicClient, CircuitBreaker, CircuitConfig, CompletionProvider, OllamaClient,
    OpenAiClient, Outcome, ResilientProvider, RetryConfig,
};
pub use template::{PromptTemplate, TemplateRegistry, TruncationStrategy, estimate_length};

pub use types::{
    Analysis, CircuitState, CompletionRequest, CompletionResult, Deadline, EntryMetadata, Expense,
    ExpenseReport, GenerationParams, JournalEntry, OutputStatus, PlaceRecommendation,
    ProviderHealth, Structured, TemplateTag, Usage,
};
