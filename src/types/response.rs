//! Completion result types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Raw text returned by a provider, with call metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Name of the provider that produced the text.
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Wall-clock time of the provider call that produced the text.
    pub latency: Duration,
    /// Set when the result was served from the response cache.
    #[serde(default)]
    pub cached: bool,
}

impl CompletionResult {
    pub fn new(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            provider: provider.into(),
            model: None,
            latency: Duration::ZERO,
            cached: false,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
