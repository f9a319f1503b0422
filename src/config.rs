//! Configuration loading.
//!
//! Settings are loaded from TOML with the following resolution order:
//! 1. explicit path (e.g. the CLI's `--config`)
//! 2. `~/.nomadic/config.toml` (user)
//! 3. `/etc/nomadic/config.toml` (system)
//!
//! Every field has a default, so running without any file is valid.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.nomadic/secrets.toml` (user, must be 0600)
//! 2. `/etc/nomadic/secrets.toml` (system, must be 0600)
//!
//! with per-provider environment variable fallback.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cache::CacheConfig;
use crate::providers::{CircuitConfig, RetryConfig};
use crate::template::TruncationStrategy;
use crate::types::GenerationParams;
use crate::{NomadicError, Result};

/// All tunables for the LLM layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub circuit: CircuitSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

/// Which backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Anthropic,
    #[default]
    Ollama,
}

impl ProviderKind {
    /// Name used for secrets lookup and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Model identifier (default depends on `kind`).
    #[serde(default)]
    pub model: Option<String>,
    /// Override the provider's base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Transport timeout per provider call in seconds (default: 60).
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: None,
            base_url: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

fn default_provider_timeout() -> u64 {
    60
}

impl ProviderSettings {
    /// Configured model, or a sensible default for the provider kind.
    pub fn model(&self) -> &str {
        if let Some(model) = &self.model {
            return model;
        }
        match self.kind {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::OpenRouter => "openai/gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::Ollama => "llama3.2",
        }
    }
}

/// Default generation parameters; templates may override some of them.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    /// Maximum output tokens (default: 512).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature (default: 0.7).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub stop: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: None,
            stop: Vec::new(),
        }
    }
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

impl From<&GenerationSettings> for GenerationParams {
    fn from(s: &GenerationSettings) -> Self {
        GenerationParams {
            max_tokens: Some(s.max_tokens),
            temperature: Some(s.temperature),
            top_p: s.top_p,
            stop_sequences: s.stop.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Entry lifetime in seconds (default: 86400).
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Maximum entries (default: 10000).
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    86_400
}

fn default_cache_entries() -> u64 {
    10_000
}

impl From<&CacheSettings> for CacheConfig {
    fn from(s: &CacheSettings) -> Self {
        CacheConfig::new()
            .enabled(s.enabled)
            .max_entries(s.max_entries)
            .ttl(Duration::from_secs(s.ttl_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Attempts including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        RetryConfig::new()
            .max_attempts(s.max_attempts)
            .initial_delay(Duration::from_millis(s.initial_delay_ms))
            .max_delay(Duration::from_millis(s.max_delay_ms))
            .jitter(s.jitter)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitSettings {
    /// Consecutive failures that open the circuit (default: 5).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            window_secs: default_window_secs(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    30
}

impl From<&CircuitSettings> for CircuitConfig {
    fn from(s: &CircuitSettings) -> Self {
        CircuitConfig::new()
            .failure_threshold(s.failure_threshold)
            .window(Duration::from_secs(s.window_secs))
            .cooldown(Duration::from_secs(s.cooldown_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    /// Estimated prompt tokens allowed before inputs are truncated
    /// (default: 3000).
    #[serde(default = "default_prompt_budget")]
    pub prompt_budget: usize,
    #[serde(default)]
    pub truncation: TruncationStrategy,
    /// Deadline for one analysis operation in seconds (default: 30).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Used when a template has no corrective instruction of its own.
    #[serde(default)]
    pub corrective_instruction: Option<String>,
    /// JSON file of templates that replace or extend the builtin set.
    #[serde(default)]
    pub templates_path: Option<PathBuf>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            prompt_budget: default_prompt_budget(),
            truncation: TruncationStrategy::default(),
            request_timeout_secs: default_request_timeout(),
            corrective_instruction: None,
            templates_path: None,
        }
    }
}

fn default_prompt_budget() -> usize {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

impl Settings {
    /// Load settings from the standard locations, or defaults if no file
    /// exists there. An explicit path that does not exist is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            NomadicError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            NomadicError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(NomadicError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".nomadic").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/nomadic/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

/// API keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub openai: Option<ApiKeySecret>,
    #[serde(default)]
    pub openrouter: Option<ApiKeySecret>,
    #[serde(default)]
    pub anthropic: Option<ApiKeySecret>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Provider name → environment variable name mapping.
const PROVIDER_ENV_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
];

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".nomadic").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/nomadic/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            NomadicError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            NomadicError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            NomadicError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(NomadicError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for `provider`, falling back to its environment variable.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let from_file = match provider {
            "openai" => self.openai.as_ref(),
            "openrouter" => self.openrouter.as_ref(),
            "anthropic" => self.anthropic.as_ref(),
            _ => None,
        }
        .map(|s| s.api_key.clone());

        from_file.or_else(|| {
            PROVIDER_ENV_VARS
                .iter()
                .find(|(name, _)| *name == provider)
                .and_then(|(_, env_var)| std::env::var(env_var).ok())
        })
    }
}
