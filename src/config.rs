//! Configuration management for LLM Council

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CouncilError;
use crate::llm::Endpoint;

/// OpenRouter chat completions route
pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which backend carries the council's requests
    pub provider_backend: ProviderBackend,

    /// Council roster and chairman
    pub council: CouncilConfig,

    /// LiteLLM proxy settings
    pub litellm: LiteLlmConfig,

    /// OpenRouter settings
    pub openrouter: OpenRouterConfig,

    /// Conversation storage
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    Litellm,
    Openrouter,
}

impl ProviderBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderBackend::Litellm => "litellm",
            ProviderBackend::Openrouter => "openrouter",
        }
    }
}

impl std::str::FromStr for ProviderBackend {
    type Err = CouncilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "litellm" => Ok(ProviderBackend::Litellm),
            "openrouter" => Ok(ProviderBackend::Openrouter),
            other => Err(CouncilError::Config(format!(
                "unknown provider backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilConfig {
    /// Models queried in parallel
    pub models: Vec<String>,

    /// Model that writes the final answer
    pub chairman: String,

    /// Per-query timeout in seconds
    pub timeout_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteLlmConfig {
    /// Proxy base URL; requests go to `{api_base}/chat/completions`
    pub api_base: Option<String>,

    /// API key (can be env var reference like $LITELLM_API_KEY)
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Chat completions URL
    pub api_url: String,

    /// API key (can be env var reference like $OPENROUTER_API_KEY)
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per conversation
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_backend: ProviderBackend::Litellm,
            council: CouncilConfig {
                models: vec![
                    "gpt-5.1".to_string(),
                    "claude-sonnet-4-5-20250929".to_string(),
                    "gemini-2.5-pro".to_string(),
                ],
                chairman: "gemini-2.5-pro".to_string(),
                timeout_secs: 120.0,
            },
            litellm: LiteLlmConfig {
                api_base: None,
                api_key: "$LITELLM_API_KEY".to_string(),
            },
            openrouter: OpenRouterConfig {
                api_url: OPENROUTER_API_URL.to_string(),
                api_key: "$OPENROUTER_API_KEY".to_string(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data/conversations"),
            },
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("llm-council")
            .join("config.toml")
    }

    /// Apply overrides from the process environment (including `.env`)
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = var("PROVIDER_BACKEND") {
            self.provider_backend = backend.parse()?;
        }
        if let Some(base) = var("LITELLM_API_BASE") {
            self.litellm.api_base = Some(base);
        }
        if let Some(key) = var("LITELLM_API_KEY") {
            self.litellm.api_key = key;
        }
        if let Some(key) = var("OPENROUTER_API_KEY") {
            self.openrouter.api_key = key;
        }
        if let Some(models) = var("COUNCIL_MODELS") {
            self.council.models = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(chairman) = var("CHAIRMAN_MODEL") {
            self.council.chairman = chairman;
        }
        if let Some(dir) = var("DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        Ok(self)
    }

    /// Presence checks only; values are otherwise passed through untouched
    pub fn validate(&self) -> std::result::Result<(), CouncilError> {
        if self.council.models.iter().all(|m| m.trim().is_empty()) {
            return Err(CouncilError::Config("council has no models".to_string()));
        }
        if self.council.chairman.trim().is_empty() {
            return Err(CouncilError::Config("no chairman model set".to_string()));
        }
        self.timeout()?;
        Ok(())
    }

    /// Per-query timeout
    pub fn timeout(&self) -> std::result::Result<Duration, CouncilError> {
        let secs = self.council.timeout_secs;
        if !(secs.is_finite() && secs > 0.0) {
            return Err(CouncilError::Config(format!(
                "timeout_secs must be positive, got {}",
                secs
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|e| CouncilError::Config(format!("timeout_secs {}: {}", secs, e)))
    }

    /// Endpoint for the selected backend, or `None` when a required value is missing
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self.provider_backend {
            ProviderBackend::Litellm => {
                let base = self
                    .litellm
                    .api_base
                    .as_deref()
                    .and_then(resolve_value)?;
                Some(Endpoint {
                    url: format!("{}/chat/completions", base.trim_end_matches('/')),
                    api_key: resolve_value(&self.litellm.api_key),
                })
            }
            ProviderBackend::Openrouter => {
                let key = resolve_value(&self.openrouter.api_key)?;
                Some(Endpoint {
                    url: self.openrouter.api_url.clone(),
                    api_key: Some(key),
                })
            }
        }
    }
}

/// Resolve a config value (handles env var references)
pub fn resolve_value(raw: &str) -> Option<String> {
    if let Some(var) = raw.strip_prefix('$') {
        std::env::var(var).ok().filter(|v| !v.is_empty())
    } else if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
