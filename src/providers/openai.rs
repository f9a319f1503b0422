//! OpenAI-compatible chat completions client.
//!
//! Speaks `POST /v1/chat/completions`. The same client serves OpenAI itself
//! and OpenRouter (which exposes the same protocol under a different base
//! URL); the provider name distinguishes them in logs and health reports.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::http;
use super::traits::CompletionProvider;
use crate::error::{ProviderError, ProviderResult};
use crate::types::{CompletionRequest, CompletionResult, Deadline, Usage};

/// Default base URL for the OpenAI API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default base URL for OpenRouter.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";

#[derive(Clone)]
pub struct OpenAiClient {
    name: String,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl OpenAiClient {
    /// Client for the OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url("openai", api_key, model, OPENAI_BASE_URL)
    }

    /// Client for OpenRouter.
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url("openrouter", api_key, model, OPENROUTER_BASE_URL)
    }

    /// Client for any OpenAI-compatible endpoint (also used with wiremock).
    pub fn with_base_url(
        name: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: http::DEFAULT_TIMEOUT,
            http: Client::new(),
        }
    }

    /// Per-request transport timeout (default: 60s). The caller's deadline
    /// still applies when it is sooner.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(provider = %self.name, model = %self.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        deadline: &Deadline,
    ) -> ProviderResult<CompletionResult> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            stop: &request.params.stop_sequences,
        };

        let builder = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);
        let (response, latency) =
            http::send_json::<ChatResponse>(&self.name, builder, self.timeout, deadline).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Unknown("response contained no choices".to_string()))?;

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        if let Some(ref usage) = usage {
            http::record_usage(&self.name, usage);
        }

        Ok(CompletionResult {
            text,
            usage,
            provider: self.name.clone(),
            model: response.model,
            latency,
            cached: false,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
