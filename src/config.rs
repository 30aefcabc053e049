//! Configuration for storage, the OpenRouter API, and search defaults.
//!
//! Loaded from `config.toml` in the data directory when present; every
//! section falls back to defaults so a missing file is not an error. The
//! API credential is read from the environment, never from the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{HindsightError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HindsightConfig {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub embedding: EmbeddingConfig,
    pub extraction: ExtractionConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per experience record, relative to
    /// the data directory.
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("experiences"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the credential. Its absence
    /// disables semantic search and extraction, nothing else.
    pub key_env: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            key_env: "OPENROUTER_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "openai/text-embedding-3-small".to_string(),
            cache_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: "google/gemma-3-4b-it:free".to_string(),
            temperature: 0.3,
            max_tokens: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub recent_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            recent_limit: 10,
        }
    }
}

impl HindsightConfig {
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.toml");
        let config: Self = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = data_dir.join("config.toml");
        let content = toml::to_string_pretty(self)
            .map_err(|e| HindsightError::Configuration(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    /// Validate configuration values for consistency.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.api.base_url.trim().is_empty() {
            errors.push("api.base_url must not be empty");
        }
        if self.api.key_env.trim().is_empty() {
            errors.push("api.key_env must not be empty");
        }
        if self.api.timeout_secs == 0 {
            errors.push("api.timeout_secs must be greater than 0");
        }
        if self.embedding.model.is_empty() {
            errors.push("embedding.model must not be empty");
        }
        if self.embedding.cache_capacity == 0 {
            errors.push("embedding.cache_capacity must be greater than 0");
        }
        if self.extraction.model.is_empty() {
            errors.push("extraction.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.extraction.temperature) {
            errors.push("extraction.temperature must be between 0.0 and 2.0");
        }
        if self.extraction.max_tokens == 0 {
            errors.push("extraction.max_tokens must be greater than 0");
        }
        if self.search.default_limit == 0 {
            errors.push("search.default_limit must be greater than 0");
        }
        if self.search.recent_limit == 0 {
            errors.push("search.recent_limit must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(HindsightError::Configuration(errors.join("; ")))
        }
    }

    /// Resolve the API credential from the environment. `None` means
    /// semantic search and extraction are unavailable for this process.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api.key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}
