//! Language-model backends.
//!
//! The workflow only needs one capability from a language model: turn a
//! prompt into text. `LanguageModel` captures that, plus a health check the
//! engine runs once at construction.
//!
//! # Backends
//!
//! - `groq` / `openai_compatible`: any server implementing the OpenAI chat
//!   completions API (Groq by default)
//! - `ollama`: a local Ollama server
//! - `mock`: canned responses, no network

mod mock;
mod ollama;
mod openai_compatible;

pub use mock::MockModel;
pub use ollama::OllamaChat;
pub use openai_compatible::{OpenAiCompatibleChat, DEFAULT_API_BASE};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::error::{EdaError, Result};

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and return the model's reply.
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Verify the backend is reachable and serves the configured model.
    async fn health_check(&self) -> Result<()>;

    /// Logical backend name (for logging and reports).
    fn backend(&self) -> &'static str;

    /// Model name.
    fn model(&self) -> &str;
}

/// Build the language model named by `config.backend`.
pub fn from_config(config: &ModelConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.backend.to_lowercase().as_str() {
        "ollama" => Ok(Arc::new(OllamaChat::new(
            &config.ollama_url,
            &config.effective_name(),
            config.temperature,
            config.timeout_seconds,
        )?)),
        "groq" | "openai_compatible" | "openai" => {
            let api_key = std::env::var(&config.api_key_env).ok();
            if api_key.is_none() && config.backend.eq_ignore_ascii_case("groq") {
                return Err(EdaError::InvalidInput(format!(
                    "The groq backend needs an API key in the {} environment variable",
                    config.api_key_env
                )));
            }
            Ok(Arc::new(OpenAiCompatibleChat::new(
                &config.api_base,
                &config.effective_name(),
                api_key,
                config.temperature,
                config.timeout_seconds,
            )?))
        }
        "mock" => Ok(Arc::new(MockModel::new())),
        other => Err(EdaError::InvalidInput(format!(
            "Unknown language-model backend '{}'. Expected one of: groq, openai_compatible, ollama, mock",
            other
        ))),
    }
}

/// Build an HTTP client with an optional request timeout.
pub(crate) fn http_client(timeout_seconds: Option<u64>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}
