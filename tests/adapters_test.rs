//! Wire-level tests for the provider adapters against wiremock servers.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nomadic_llm::{
    AnthropicClient, CompletionProvider, CompletionRequest, Deadline, GenerationParams,
    OllamaClient, OpenAiClient, ProviderError, Usage,
};

fn request() -> CompletionRequest {
    CompletionRequest::new(
        "Summarize my day in Kyoto",
        GenerationParams::default().max_tokens(200).temperature(0.4),
    )
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(10))
}

// ============================================================================
// OpenAI-compatible
// ============================================================================

#[tokio::test]
async fn openai_success_parses_text_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "Summarize my day in Kyoto"}],
            "max_tokens": 200
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{"message": {"role": "assistant", "content": "A golden day."}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("openai", "sk-test", "gpt-4o-mini", server.uri());
    let result = client.complete(&request(), &deadline()).await.unwrap();

    assert_eq!(result.text, "A golden day.");
    assert_eq!(result.provider, "openai");
    assert_eq!(result.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    assert_eq!(
        result.usage,
        Some(Usage {
            prompt_tokens: 12,
            completion_tokens: 4,
            total_tokens: 16,
        })
    );
    assert!(!result.cached);
}

#[tokio::test]
async fn openai_empty_choices_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("openai", "sk-test", "gpt-4o-mini", server.uri());
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Unknown(_)));
}

#[tokio::test]
async fn openai_status_codes_map_to_taxonomy() {
    let cases = [
        (401, ProviderError::Unauthorized),
        (403, ProviderError::Unauthorized),
        (504, ProviderError::Timeout),
    ];
    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        let client = OpenAiClient::with_base_url("openai", "sk-test", "m", server.uri());
        let err = client.complete(&request(), &deadline()).await.unwrap_err();
        assert_eq!(err, expected, "status {status}");
    }
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("openrouter", "sk-test", "m", server.uri());
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert_eq!(
        err,
        ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(3))
        }
    );
    assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
}

#[tokio::test]
async fn server_errors_are_unavailable_and_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("openai", "sk-test", "m", server.uri());
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ProviderUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn bad_request_is_invalid_and_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("context length exceeded"))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("openai", "sk-test", "m", server.uri());
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn slow_server_hits_the_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({"choices": []})),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("openai", "sk-test", "m", server.uri());
    let short = Deadline::after(Duration::from_millis(200));
    let err = client.complete(&request(), &short).await.unwrap_err();
    assert_eq!(err, ProviderError::Timeout);
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    // Nothing listens on the discard port.
    let client = OpenAiClient::with_base_url("openai", "sk-test", "m", "http://127.0.0.1:9");
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ProviderUnavailable(_)));
}

// ============================================================================
// Anthropic
// ============================================================================

#[tokio::test]
async fn anthropic_success_joins_text_blocks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-haiku-latest",
            "max_tokens": 200,
            "messages": [{"role": "user", "content": "Summarize my day in Kyoto"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "claude-3-5-haiku-20241022",
            "content": [
                {"type": "text", "text": "Temples "},
                {"type": "text", "text": "and tea."}
            ],
            "usage": {"input_tokens": 20, "output_tokens": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        AnthropicClient::with_base_url("sk-ant-test", "claude-3-5-haiku-latest", server.uri());
    let result = client.complete(&request(), &deadline()).await.unwrap();

    assert_eq!(result.text, "Temples and tea.");
    assert_eq!(result.provider, "anthropic");
    let usage = result.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 20);
    assert_eq!(usage.completion_tokens, 5);
    assert_eq!(usage.total_tokens, 25);
}

#[tokio::test]
async fn anthropic_defaults_max_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 1024})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "ok"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url("sk-ant-test", "claude", server.uri());
    let unset = CompletionRequest::new("hi", GenerationParams::unset());
    let result = client.complete(&unset, &deadline()).await.unwrap();
    assert_eq!(result.text, "ok");
}

#[tokio::test]
async fn anthropic_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url("bad", "claude", server.uri());
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert_eq!(err, ProviderError::Unauthorized);
}

// ============================================================================
// Ollama
// ============================================================================

#[tokio::test]
async fn ollama_success_reads_eval_counts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "prompt": "Summarize my day in Kyoto",
            "stream": false,
            "options": {"num_predict": 200}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "response": "Lanterns at dusk.",
            "done": true,
            "prompt_eval_count": 30,
            "eval_count": 6
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url("llama3.2", server.uri());
    let result = client.complete(&request(), &deadline()).await.unwrap();

    assert_eq!(result.text, "Lanterns at dusk.");
    assert_eq!(result.provider, "ollama");
    assert_eq!(result.usage.map(|u| u.total_tokens), Some(36));
}

#[tokio::test]
async fn ollama_missing_model_is_invalid_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "model 'x' not found"})),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url("x", server.uri());
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}

#[tokio::test]
async fn undecodable_body_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url("llama3.2", server.uri());
    let err = client.complete(&request(), &deadline()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Unknown(_)));
}
