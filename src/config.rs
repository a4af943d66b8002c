//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.edaflow.toml` files. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EdaError;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".edaflow.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Language-model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Embedding backend settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Knowledge-base retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory plot artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Report file path.
    #[serde(default = "default_report")]
    pub report: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            report: default_report(),
            verbose: false,
        }
    }
}

fn default_output_dir() -> String {
    "static/plots".to_string()
}

fn default_report() -> String {
    "eda_report.md".to_string()
}

/// Language-model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend name: groq, openai_compatible, ollama or mock.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Model name. Falls back to a per-backend default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            name: None,
            ollama_url: default_ollama_url(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_seconds: None,
        }
    }
}

impl ModelConfig {
    /// The configured model name, or the default for the backend.
    pub fn effective_name(&self) -> String {
        if let Some(ref name) = self.name {
            return name.clone();
        }
        match self.backend.to_lowercase().as_str() {
            "ollama" => "qwen3:4b".to_string(),
            "mock" => "mock".to_string(),
            _ => "llama-3.1-8b-instant".to_string(),
        }
    }
}

fn default_backend() -> String {
    "groq".to_string()
}

fn default_ollama_url() -> String {
    crate::ollama::DEFAULT_OLLAMA_URL.to_string()
}

fn default_api_base() -> String {
    crate::llm::DEFAULT_API_BASE.to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend name: ollama or hashing.
    #[serde(default = "default_embedding_backend")]
    pub backend: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Vector size for the hashing backend.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Number of chunks sent per embedding request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            model: default_embedding_model(),
            ollama_url: default_ollama_url(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            timeout_seconds: None,
        }
    }
}

fn default_embedding_backend() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimensions() -> usize {
    256
}

fn default_batch_size() -> usize {
    32
}

/// Knowledge-base retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Run the retrieval step at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// CSV corpus of analysis techniques.
    #[serde(default = "default_knowledge_base")]
    pub knowledge_base: String,

    /// Directory holding the persisted vector index.
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Chunk window in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Documents retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            knowledge_base: default_knowledge_base(),
            index_path: default_index_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_knowledge_base() -> String {
    "knowledge/eda_knowledge_base.csv".to_string()
}

fn default_index_path() -> String {
    ".edaflow/index".to_string()
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    5
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref backend) = args.backend {
            self.model.backend = backend.clone();
        }
        if let Some(ref model) = args.model {
            self.model.name = Some(model.clone());
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = Some(timeout);
            self.embedding.timeout_seconds = Some(timeout);
        }

        // One Ollama server usually serves both chat and embeddings
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
            self.embedding.ollama_url = url.clone();
        }

        if let Some(ref backend) = args.embedding_backend {
            self.embedding.backend = backend.clone();
        }
        if let Some(ref model) = args.embedding_model {
            self.embedding.model = model.clone();
        }

        if let Some(ref path) = args.knowledge_base {
            self.retrieval.knowledge_base = path.display().to_string();
        }
        if let Some(ref path) = args.index_path {
            self.retrieval.index_path = path.display().to_string();
        }
        if let Some(top_k) = args.top_k {
            self.retrieval.top_k = top_k;
        }
        if args.no_retrieval {
            self.retrieval.enabled = false;
        }

        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = dir.display().to_string();
        }
        if let Some(ref output) = args.output {
            self.general.report = output.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level for the run. `quiet` wins; otherwise `general.verbose`
    /// (set by the file or by `--verbose`) selects DEBUG.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Check values that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> crate::error::Result<()> {
        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 {
            return Err(EdaError::InvalidInput(
                "retrieval.chunk_size must be at least 1".to_string(),
            ));
        }
        if retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(EdaError::InvalidInput(format!(
                "retrieval.chunk_overlap ({}) must be smaller than retrieval.chunk_size ({})",
                retrieval.chunk_overlap, retrieval.chunk_size
            )));
        }
        if retrieval.top_k == 0 {
            return Err(EdaError::InvalidInput(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(EdaError::InvalidInput(format!(
                "model.temperature must be between 0.0 and 2.0, got {}",
                self.model.temperature
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(EdaError::InvalidInput(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
