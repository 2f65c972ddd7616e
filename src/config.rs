//! Configuration for the QA pipeline and the answer grader.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default OpenAI-compatible API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Number of passages retrieved per question.
pub const DEFAULT_TOP_K: usize = 8;

/// LLM configuration, used for both the answer generator and the grader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4o", "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

impl LlmConfig {
    fn with_model(model: &str) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            model: model.to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    /// Defaults for the answer-generating model.
    pub fn generator() -> Self {
        Self::with_model("gpt-4o")
    }

    /// Defaults for the grading model.
    pub fn grader() -> Self {
        Self::with_model("gpt-4o-mini")
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::generator()
    }
}

/// Embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Requested output dimension; `None` keeps the model's native size.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            model: "text-embedding-3-large".to_string(),
            dimensions: None,
        }
    }
}

/// Retrieval and prompting settings for the QA pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Passages returned by similarity search (the table is always added on top).
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model that answers questions from retrieved context
    pub generator: LlmConfig,
    /// Model that grades generated answers
    pub grader: LlmConfig,
    /// Embedding service settings
    pub embedding: EmbeddingConfig,
    /// Retrieval settings
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator: LlmConfig::generator(),
            grader: LlmConfig::grader(),
            embedding: EmbeddingConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    api_base: Option<String>,
    api_key: Option<String>,
    generator: Option<LlmFileSection>,
    grader: Option<LlmFileSection>,
    embedding: Option<EmbeddingFileSection>,
    pipeline: Option<PipelineFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PipelineFileSection {
    top_k: Option<usize>,
}

impl LlmFileSection {
    fn apply(self, llm: &mut LlmConfig) {
        if let Some(api_base) = self.api_base {
            llm.api_base = api_base;
        }
        if let Some(api_key) = self.api_key {
            llm.api_key = api_key;
        }
        if let Some(model) = self.model {
            llm.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            llm.temperature = temperature;
        }
    }
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, LLM_MODEL, ...)
    /// 2. Config file (~/.config/finqa-rag/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        // The shared connection settings reach every service.
        if let Some(api_base) = var("LLM_API_BASE") {
            self.generator.api_base = api_base.clone();
            self.grader.api_base = api_base.clone();
            self.embedding.api_base = api_base;
        }

        if let Some(api_key) = var("LLM_API_KEY") {
            self.generator.api_key = api_key.clone();
            self.grader.api_key = api_key.clone();
            self.embedding.api_key = api_key;
        }

        if let Some(model) = var("LLM_MODEL") {
            self.generator.model = model;
        }

        if let Some(model) = var("GRADER_MODEL") {
            self.grader.model = model;
        }

        if let Some(model) = var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(dimensions) = var("EMBEDDING_DIMENSIONS") {
            if let Ok(dims) = dimensions.parse() {
                self.embedding.dimensions = Some(dims);
            }
        }

        if let Some(max_tokens) = var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.generator.max_tokens = tokens;
                self.grader.max_tokens = tokens;
            }
        }

        if let Some(temperature) = var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                self.generator.temperature = temp;
                self.grader.temperature = temp;
            }
        }

        if let Some(top_k) = var("RETRIEVAL_TOP_K") {
            if let Ok(k) = top_k.parse() {
                self.pipeline.top_k = k;
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| RagError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        // Top-level connection settings are shared by all services.
        if let Some(api_base) = file_config.api_base {
            config.generator.api_base = api_base.clone();
            config.grader.api_base = api_base.clone();
            config.embedding.api_base = api_base;
        }
        if let Some(api_key) = file_config.api_key {
            config.generator.api_key = api_key.clone();
            config.grader.api_key = api_key.clone();
            config.embedding.api_key = api_key;
        }

        if let Some(generator) = file_config.generator {
            generator.apply(&mut config.generator);
        }
        if let Some(grader) = file_config.grader {
            grader.apply(&mut config.grader);
        }

        if let Some(embedding) = file_config.embedding {
            if let Some(api_base) = embedding.api_base {
                config.embedding.api_base = api_base;
            }
            if let Some(api_key) = embedding.api_key {
                config.embedding.api_key = api_key;
            }
            if let Some(model) = embedding.model {
                config.embedding.model = model;
            }
            if embedding.dimensions.is_some() {
                config.embedding.dimensions = embedding.dimensions;
            }
        }

        if let Some(pipeline) = file_config.pipeline {
            if let Some(top_k) = pipeline.top_k {
                config.pipeline.top_k = top_k;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "finqa-rag")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        for (name, llm) in [("generator", &self.generator), ("grader", &self.grader)] {
            if llm.api_base.is_empty() {
                return Err(RagError::Config(format!(
                    "{} API base URL is required. Set LLM_API_BASE environment variable or add to config file.",
                    name
                )));
            }
            if llm.api_key.is_empty() {
                return Err(RagError::Config(format!(
                    "{} API key is required. Set LLM_API_KEY environment variable or add to config file.",
                    name
                )));
            }
            if llm.model.is_empty() {
                return Err(RagError::Config(format!("{} model name is required", name)));
            }
        }

        if self.embedding.api_key.is_empty() || self.embedding.model.is_empty() {
            return Err(RagError::Config(
                "Embedding API key and model are required.".to_string(),
            ));
        }

        if self.pipeline.top_k == 0 {
            return Err(RagError::Config(
                "Retrieval top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config sharing one endpoint and key across services (useful for testing).
    pub fn with_credentials(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_base = api_base.into();
        let api_key = api_key.into();
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "LLM_API_BASE" => Some(api_base.clone()),
            "LLM_API_KEY" => Some(api_key.clone()),
            _ => None,
        });
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generator.api_base, DEFAULT_API_BASE);
        assert!(config.generator.api_key.is_empty());
        assert_eq!(config.generator.model, "gpt-4o");
        assert_eq!(config.grader.model, "gpt-4o-mini");
        assert_eq!(config.embedding.model, "text-embedding-3-large");
        assert_eq!(config.pipeline.top_k, 8);
        assert_eq!(config.generator.max_tokens, 4096);
        assert_eq!(config.generator.temperature, 0.0);
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_credentials() {
        let config = Config::with_credentials("https://api.example.com", "test-key");
        assert_eq!(config.generator.api_base, "https://api.example.com");
        assert_eq!(config.grader.api_key, "test-key");
        assert_eq!(config.embedding.api_key, "test-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_top_k_is_rejected() {
        let mut config = Config::with_credentials("https://api.example.com", "k");
        config.pipeline.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "LLM_MODEL" => Some("gpt-4.1".to_string()),
            "GRADER_MODEL" => Some("judge".to_string()),
            "RETRIEVAL_TOP_K" => Some("3".to_string()),
            "EMBEDDING_DIMENSIONS" => Some("256".to_string()),
            "LLM_TEMPERATURE" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(config.generator.model, "gpt-4.1");
        assert_eq!(config.grader.model, "judge");
        assert_eq!(config.pipeline.top_k, 3);
        assert_eq!(config.embedding.dimensions, Some(256));
        assert_eq!(config.generator.temperature, 0.0);
    }

    #[test]
    fn test_from_yaml_sections() {
        let yaml = r#"
api_base: https://proxy.internal
api_key: shared
grader:
  model: gpt-4o
  temperature: 0.2
embedding:
  api_key: embed-only
pipeline:
  top_k: 4
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.generator.api_base, "https://proxy.internal");
        assert_eq!(config.generator.api_key, "shared");
        assert_eq!(config.grader.model, "gpt-4o");
        assert_eq!(config.grader.temperature, 0.2);
        assert_eq!(config.embedding.api_base, "https://proxy.internal");
        assert_eq!(config.embedding.api_key, "embed-only");
        assert_eq!(config.pipeline.top_k, 4);
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        assert!(Config::from_yaml("generator: [1, 2").is_err());
    }
}
