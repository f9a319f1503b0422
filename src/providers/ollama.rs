//! Local inference through an Ollama server.
//!
//! Uses the non-streaming `POST /api/generate` endpoint. No credentials.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::http;
use super::traits::CompletionProvider;
use crate::error::ProviderResult;
use crate::types::{CompletionRequest, CompletionResult, Deadline, Usage};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Clone)]
pub struct OllamaClient {
    model: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_base_url(model, OLLAMA_BASE_URL)
    }

    pub fn with_base_url(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
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
impl CompletionProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip_all, fields(provider = "ollama", model = %self.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        deadline: &Deadline,
    ) -> ProviderResult<CompletionResult> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.params.temperature,
                top_p: request.params.top_p,
                num_predict: request.params.max_tokens,
                stop: &request.params.stop_sequences,
            },
        };

        let builder = self.http.post(&url).json(&body);
        let (response, latency) =
            http::send_json::<GenerateResponse>(self.name(), builder, self.timeout, deadline).await?;

        // Ollama reports eval counts only when it actually ran the model.
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt = prompt.unwrap_or(0);
                let completion = completion.unwrap_or(0);
                Some(Usage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                    total_tokens: prompt + completion,
                })
            }
        };
        if let Some(ref usage) = usage {
            http::record_usage(self.name(), usage);
        }

        Ok(CompletionResult {
            text: response.response,
            usage,
            provider: self.name().to_string(),
            model: response.model,
            latency,
            cached: false,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Serialize)]
struct GenerateOptions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}
