//! OpenAI-compatible chat backend.
//!
//! Works with any server implementing `POST {base}/chat/completions` and
//! `GET {base}/models`: Groq (the default), vLLM, LocalAI, llama-server.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LanguageModel;
use crate::error::{EdaError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Language model behind an OpenAI-style chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiCompatibleChat {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiCompatibleChat {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        temperature: f32,
        timeout_seconds: Option<u64>,
    ) -> Result<Self> {
        let http_client = super::http_client(timeout_seconds)
            .map_err(|e| EdaError::ModelInvocation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            temperature,
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> EdaError {
        if e.is_connect() {
            EdaError::ModelServiceUnreachable {
                backend: "openai_compatible".to_string(),
                url: self.base_url.clone(),
            }
        } else {
            EdaError::ModelInvocation(format!("Failed to send request: {}", e))
        }
    }

    fn model_missing(&self) -> EdaError {
        EdaError::ModelNotFound {
            backend: "openai_compatible".to_string(),
            model: self.model.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleChat {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stream: false,
        };

        debug!("Sending chat completion to {} ({} chars)", self.base_url, prompt.len());

        let response = self
            .authorize(
                self.http_client
                    .post(format!("{}/chat/completions", self.base_url))
                    .json(&request),
            )
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND || body.contains("model_not_found") {
                return Err(self.model_missing());
            }
            return Err(EdaError::ModelInvocation(format!(
                "Chat completion API error {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| EdaError::ModelInvocation(format!("Failed to parse response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EdaError::ModelInvocation("Response contained no choices".to_string()))
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .authorize(self.http_client.get(format!("{}/models", self.base_url)))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EdaError::ModelInvocation(format!(
                "API key rejected by {}",
                self.base_url
            )));
        }
        if !status.is_success() {
            return Err(EdaError::ModelInvocation(format!(
                "GET /models returned {}",
                status
            )));
        }

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| EdaError::ModelInvocation(format!("Invalid /models response: {}", e)))?;

        if models.data.iter().any(|m| m.id == self.model) {
            Ok(())
        } else {
            Err(self.model_missing())
        }
    }

    fn backend(&self) -> &'static str {
        "openai_compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
