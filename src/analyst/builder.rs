//! Builder for [`JournalAnalyst`] instances.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{AnalystConfig, Inner, JournalAnalyst};
use crate::cache::{CacheBackend, CacheConfig, CachingProvider};
use crate::config::{ProviderKind, Secrets, Settings};
use crate::providers::{
    AnthropicClient, CircuitConfig, CompletionProvider, OllamaClient, OpenAiClient,
    ResilientProvider, RetryConfig,
};
use crate::template::{TemplateRegistry, TruncationStrategy};
use crate::types::GenerationParams;
use crate::{NomadicError, Result};

/// Assembles the provider chain (resilience → cache → provider) and the
/// template set.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use nomadic_llm::{JournalAnalyst, OllamaClient, RetryConfig};
/// let analyst = JournalAnalyst::builder()
///     .provider(Arc::new(OllamaClient::new("llama3.2")))
///     .retry(RetryConfig::new().max_attempts(2))
///     .build()?;
/// # Ok::<(), nomadic_llm::NomadicError>(())
/// ```
pub struct AnalystBuilder {
    provider: Option<Arc<dyn CompletionProvider>>,
    templates: Option<TemplateRegistry>,
    cache: CacheConfig,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    retry: RetryConfig,
    circuit: CircuitConfig,
    config: AnalystConfig,
}

impl Default for AnalystBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalystBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            templates: None,
            cache: CacheConfig::default(),
            cache_backend: None,
            retry: RetryConfig::default(),
            circuit: CircuitConfig::default(),
            config: AnalystConfig::default(),
        }
    }

    /// Builder populated from loaded settings and secrets.
    ///
    /// Fails if the configured provider needs an API key and none is
    /// available, or if the configured templates file cannot be loaded.
    pub fn from_settings(settings: &Settings, secrets: &Secrets) -> Result<Self> {
        let provider = provider_from_settings(settings, secrets)?;

        let mut templates = TemplateRegistry::builtin();
        if let Some(path) = &settings.analysis.templates_path {
            let loaded = templates.load_file(path)?;
            info!(path = %path.display(), loaded, "loaded templates");
        }

        let mut builder = Self::new()
            .provider(provider)
            .templates(templates)
            .cache(CacheConfig::from(&settings.cache))
            .retry(RetryConfig::from(&settings.retry))
            .circuit(CircuitConfig::from(&settings.circuit))
            .generation(GenerationParams::from(&settings.generation))
            .prompt_budget(settings.analysis.prompt_budget)
            .truncation(settings.analysis.truncation)
            .request_timeout(Duration::from_secs(settings.analysis.request_timeout_secs));
        if let Some(instruction) = &settings.analysis.corrective_instruction {
            builder = builder.corrective_instruction(instruction.clone());
        }
        Ok(builder)
    }

    /// The backend that generates text.
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Template set to use instead of the builtin one.
    pub fn templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Store cache entries somewhere other than the in-memory default.
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Shorthand for disabling the response cache.
    pub fn disable_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn circuit(mut self, config: CircuitConfig) -> Self {
        self.circuit = config;
        self
    }

    /// Base generation parameters for every request.
    pub fn generation(mut self, params: GenerationParams) -> Self {
        self.config.params = params;
        self
    }

    pub fn prompt_budget(mut self, budget: usize) -> Self {
        self.config.prompt_budget = budget;
        self
    }

    pub fn truncation(mut self, strategy: TruncationStrategy) -> Self {
        self.config.truncation = strategy;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn corrective_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.corrective_instruction = instruction.into();
        self
    }

    pub fn question_count(mut self, n: usize) -> Self {
        self.config.question_count = n.max(1);
        self
    }

    pub fn recommendation_count(mut self, n: usize) -> Self {
        self.config.recommendation_count = n.max(1);
        self
    }

    pub fn build(self) -> Result<JournalAnalyst> {
        let provider = self.provider.ok_or(NomadicError::NoProvider)?;

        let mut cache = None;
        let inner_chain: Arc<dyn CompletionProvider> = if self.cache.enabled {
            let caching = Arc::new(match self.cache_backend {
                Some(backend) => CachingProvider::with_backend(provider, backend, self.cache.ttl),
                None => CachingProvider::new(provider, &self.cache),
            });
            cache = Some(caching.clone());
            caching
        } else {
            provider
        };

        let chain = ResilientProvider::new(inner_chain, self.retry, self.circuit);
        let templates = self.templates.unwrap_or_else(TemplateRegistry::builtin);

        Ok(JournalAnalyst {
            inner: Arc::new(Inner {
                templates,
                chain,
                cache,
                config: self.config,
            }),
        })
    }
}

fn provider_from_settings(
    settings: &Settings,
    secrets: &Secrets,
) -> Result<Arc<dyn CompletionProvider>> {
    let p = &settings.provider;
    let timeout = Duration::from_secs(p.timeout_secs);
    let api_key = if p.kind.requires_api_key() {
        secrets.api_key(p.kind.as_str()).ok_or_else(|| {
            NomadicError::Configuration(format!(
                "no API key for provider '{}' (secrets file or environment)",
                p.kind.as_str()
            ))
        })?
    } else {
        String::new()
    };

    let provider: Arc<dyn CompletionProvider> = match p.kind {
        ProviderKind::OpenAi => {
            let client = match &p.base_url {
                Some(url) => OpenAiClient::with_base_url("openai", api_key, p.model(), url),
                None => OpenAiClient::new(api_key, p.model()),
            };
            Arc::new(client.timeout(timeout))
        }
        ProviderKind::OpenRouter => {
            let client = match &p.base_url {
                Some(url) => OpenAiClient::with_base_url("openrouter", api_key, p.model(), url),
                None => OpenAiClient::openrouter(api_key, p.model()),
            };
            Arc::new(client.timeout(timeout))
        }
        ProviderKind::Anthropic => {
            let client = match &p.base_url {
                Some(url) => AnthropicClient::with_base_url(api_key, p.model(), url),
                None => AnthropicClient::new(api_key, p.model()),
            };
            Arc::new(client.timeout(timeout))
        }
        ProviderKind::Ollama => {
            let client = match &p.base_url {
                Some(url) => OllamaClient::with_base_url(p.model(), url),
                None => OllamaClient::new(p.model()),
            };
            Arc::new(client.timeout(timeout))
        }
    };
    info!(provider = provider.name(), model = p.model(), "provider configured");
    Ok(provider)
}
