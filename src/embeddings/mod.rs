//! Embedding backends.
//!
//! Converts text into vectors for the knowledge index. Backends are selected
//! by logical name, like the language models:
//! - `ollama`: Ollama's `/api/embed` endpoint (e.g. `nomic-embed-text`)
//! - `hashing`: deterministic feature hashing, no network

mod hashing;
mod ollama;

pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::{EdaError, Result};

/// Trait for backends that convert text to vectors.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EdaError::Embedding("Empty embedding response".to_string()))
    }

    /// Verify the service is reachable and the model is installed.
    async fn health_check(&self) -> Result<()>;

    /// Model identifier, recorded in the index manifest.
    fn model_name(&self) -> &str;
}

/// Build the embedding backend named by `config.backend`.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingBackend>> {
    match config.backend.to_lowercase().as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            &config.ollama_url,
            &config.model,
            config.timeout_seconds,
        )?)),
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
        other => Err(EdaError::InvalidInput(format!(
            "Unknown embedding backend '{}'. Expected one of: ollama, hashing",
            other
        ))),
    }
}

/// Cosine similarity of two vectors. `None` when lengths differ or either
/// vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        None
    } else {
        Some(dot / denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn test_from_config() {
        let config = EmbeddingConfig {
            backend: "hashing".to_string(),
            dimensions: 64,
            ..EmbeddingConfig::default()
        };
        let embedder = from_config(&config).unwrap();
        assert_eq!(embedder.model_name(), "hashing-64");

        let bad = EmbeddingConfig {
            backend: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(from_config(&bad).is_err());
    }
}
