//! Ollama embedding backend.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EmbeddingBackend;
use crate::error::{EdaError, Result};
use crate::ollama::{self, ProbeError};

/// Embeddings from a local Ollama server (`POST /api/embed`).
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(endpoint: &str, model: &str, timeout_seconds: Option<u64>) -> Result<Self> {
        let client = crate::llm::http_client(timeout_seconds)
            .map_err(|e| EdaError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: ollama::normalize_url(endpoint),
            model: model.to_string(),
        })
    }

    fn unreachable(&self) -> EdaError {
        EdaError::EmbeddingServiceUnreachable {
            url: self.endpoint.clone(),
        }
    }

    fn model_missing(&self) -> EdaError {
        EdaError::EmbeddingModelMissing {
            model: self.model.clone(),
            url: self.endpoint.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let response = self
            .client
            .post(format!("{}/api/embed", self.endpoint))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    self.unreachable()
                } else {
                    EdaError::Embedding(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND && ollama::is_model_missing_body(&body) {
                return Err(self.model_missing());
            }
            return Err(EdaError::Embedding(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EdaError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if result.embeddings.len() != texts.len() {
            return Err(EdaError::Embedding(format!(
                "Mismatch: {} texts but {} embeddings",
                texts.len(),
                result.embeddings.len()
            )));
        }

        Ok(result.embeddings)
    }

    async fn health_check(&self) -> Result<()> {
        match ollama::probe_model(&self.client, &self.endpoint, &self.model).await {
            Ok(()) => Ok(()),
            Err(ProbeError::Unreachable) => Err(self.unreachable()),
            Err(ProbeError::ModelMissing) => Err(self.model_missing()),
            Err(ProbeError::Other(msg)) => Err(EdaError::Embedding(msg)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::MockOllamaServer;

    #[tokio::test]
    async fn test_embed_batch() {
        let server = MockOllamaServer::start(&["nomic-embed-text:latest"]).await;
        let embedder = OllamaEmbedder::new(&server.url(), "nomic-embed-text", None).unwrap();

        embedder.health_check().await.unwrap();
        let vectors = embedder
            .embed_batch(&["one".to_string(), "two".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), MockOllamaServer::EMBEDDING_DIMS);
    }

    #[tokio::test]
    async fn test_model_missing_vs_service_down() {
        let server = MockOllamaServer::start(&["llama3.2:latest"]).await;
        let embedder = OllamaEmbedder::new(&server.url(), "nomic-embed-text", None).unwrap();

        let missing = embedder.health_check().await.unwrap_err();
        assert!(matches!(missing, EdaError::EmbeddingModelMissing { .. }));
        let missing_on_embed = embedder.embed("text").await.unwrap_err();
        assert!(matches!(missing_on_embed, EdaError::EmbeddingModelMissing { .. }));

        let offline = OllamaEmbedder::new("http://127.0.0.1:9", "nomic-embed-text", None).unwrap();
        let down = offline.embed("text").await.unwrap_err();
        assert!(matches!(down, EdaError::EmbeddingServiceUnreachable { .. }));
        assert_eq!(down.kind(), ErrorKind::EmbeddingBackend);
        assert_ne!(down.to_string(), missing.to_string());
    }
}
