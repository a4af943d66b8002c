//! Shared helpers for talking to an Ollama server.
//!
//! Both the chat and the embedding backends verify at construction time
//! that the server is reachable and that the requested model is installed.
//! The two conditions need different fixes, so they are reported separately.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Outcome of probing an Ollama server for a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// No connection could be made.
    Unreachable,
    /// The server answered but does not have the model.
    ModelMissing,
    /// The server answered with something unexpected.
    Other(String),
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Normalize a base URL (no trailing slash).
pub fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// List the models installed on the server.
pub async fn list_models(client: &Client, base_url: &str) -> Result<Vec<String>, ProbeError> {
    let response = client
        .get(format!("{}/api/tags", base_url))
        .send()
        .await
        .map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProbeError::Unreachable
            } else {
                ProbeError::Other(e.to_string())
            }
        })?;

    if !response.status().is_success() {
        return Err(ProbeError::Other(format!(
            "GET /api/tags returned {}",
            response.status()
        )));
    }

    let tags: TagsResponse = response
        .json()
        .await
        .map_err(|e| ProbeError::Other(format!("invalid /api/tags response: {}", e)))?;

    Ok(tags.models.into_iter().map(|m| m.name).collect())
}

/// Check that `model` is installed on the server.
pub async fn probe_model(client: &Client, base_url: &str, model: &str) -> Result<(), ProbeError> {
    let installed = list_models(client, base_url).await?;
    debug!("Ollama at {} has {} models installed", base_url, installed.len());

    if installed.iter().any(|name| model_matches(name, model)) {
        Ok(())
    } else {
        Err(ProbeError::ModelMissing)
    }
}

/// Whether an installed model name satisfies a requested one. An untagged
/// request matches the `:latest` tag.
pub fn model_matches(installed: &str, requested: &str) -> bool {
    if installed == requested {
        return true;
    }
    if !requested.contains(':') {
        return installed == format!("{}:latest", requested);
    }
    false
}

/// Whether an Ollama error body reports a missing model.
pub fn is_model_missing_body(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("not found") && body.contains("model")
}
