//! Ollama chat backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LanguageModel;
use crate::error::{EdaError, Result};
use crate::ollama::{self, ProbeError};

/// Language model served by a local Ollama server through `/api/chat`.
#[derive(Clone)]
pub struct OllamaChat {
    http_client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaChat {
    pub fn new(
        base_url: &str,
        model: &str,
        temperature: f32,
        timeout_seconds: Option<u64>,
    ) -> Result<Self> {
        let http_client = super::http_client(timeout_seconds)
            .map_err(|e| EdaError::ModelInvocation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: ollama::normalize_url(base_url),
            model: model.to_string(),
            temperature,
        })
    }

    fn unreachable(&self) -> EdaError {
        EdaError::ModelServiceUnreachable {
            backend: "ollama".to_string(),
            url: self.base_url.clone(),
        }
    }

    fn model_missing(&self) -> EdaError {
        EdaError::ModelNotFound {
            backend: "ollama".to_string(),
            model: self.model.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaChat {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        debug!("Sending chat request to Ollama ({} chars)", prompt.len());

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    self.unreachable()
                } else if e.is_timeout() {
                    EdaError::ModelInvocation(format!("Request to {} timed out", self.base_url))
                } else {
                    EdaError::ModelInvocation(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND && ollama::is_model_missing_body(&body) {
                return Err(self.model_missing());
            }
            return Err(EdaError::ModelInvocation(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EdaError::ModelInvocation(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(chat_response.message.content)
    }

    async fn health_check(&self) -> Result<()> {
        match ollama::probe_model(&self.http_client, &self.base_url, &self.model).await {
            Ok(()) => Ok(()),
            Err(ProbeError::Unreachable) => Err(self.unreachable()),
            Err(ProbeError::ModelMissing) => Err(self.model_missing()),
            Err(ProbeError::Other(msg)) => Err(EdaError::ModelInvocation(msg)),
        }
    }

    fn backend(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::MockOllamaServer;

    #[tokio::test]
    async fn test_invoke_returns_message_content() {
        let server = MockOllamaServer::start(&["qwen3:4b"]).await;
        let chat = OllamaChat::new(&server.url(), "qwen3:4b", 1.0, None).unwrap();

        chat.health_check().await.unwrap();
        let reply = chat.invoke("Say something").await.unwrap();
        assert_eq!(reply, server.chat_reply());
    }

    #[tokio::test]
    async fn test_missing_model_is_distinct_from_unreachable() {
        let server = MockOllamaServer::start(&["llama3.2:latest"]).await;
        let chat = OllamaChat::new(&server.url(), "qwen3:4b", 1.0, None).unwrap();

        let missing = chat.health_check().await.unwrap_err();
        assert!(matches!(missing, EdaError::ModelNotFound { .. }));

        let invoke_missing = chat.invoke("hi").await.unwrap_err();
        assert!(matches!(invoke_missing, EdaError::ModelNotFound { .. }));

        let offline = OllamaChat::new("http://127.0.0.1:9", "qwen3:4b", 1.0, None).unwrap();
        let down = offline.health_check().await.unwrap_err();
        assert!(matches!(down, EdaError::ModelServiceUnreachable { .. }));
        assert_eq!(down.kind(), ErrorKind::ModelInvocation);
    }
}
