//! Test utilities.
//!
//! A mock Ollama server that answers the endpoints the chat and embedding
//! backends use, with a configurable set of installed models.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::embeddings::HashingEmbedder;
use crate::ollama::model_matches;

const CHAT_REPLY: &str = "Values cluster tightly around the median with a few high outliers.";

/// Mock Ollama server for tests.
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

#[derive(Clone)]
struct MockState {
    installed: Arc<Vec<String>>,
    embedder: Arc<HashingEmbedder>,
}

impl MockState {
    fn has_model(&self, requested: &str) -> bool {
        self.installed.iter().any(|m| model_matches(m, requested))
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    model: String,
}

#[derive(Deserialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

impl MockOllamaServer {
    pub const EMBEDDING_DIMS: usize = 32;

    /// Start the mock server on an available port with `installed` models.
    pub async fn start(installed: &[&str]) -> Self {
        let state = MockState {
            installed: Arc::new(installed.iter().map(|m| m.to_string()).collect()),
            embedder: Arc::new(HashingEmbedder::new(Self::EMBEDDING_DIMS)),
        };

        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/chat", post(handle_chat))
            .route("/api/embed", post(handle_embed))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this mock server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The reply every chat request receives.
    pub fn chat_reply(&self) -> &'static str {
        CHAT_REPLY
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn model_not_found(model: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": format!("model \"{}\" not found, try pulling it first", model)
        })),
    )
        .into_response()
}

async fn handle_tags(State(state): State<MockState>) -> Json<serde_json::Value> {
    let models: Vec<_> = state
        .installed
        .iter()
        .map(|name| json!({ "name": name, "modified_at": "2024-01-01T00:00:00Z", "size": 1_000_000 }))
        .collect();
    Json(json!({ "models": models }))
}

async fn handle_chat(State(state): State<MockState>, Json(request): Json<ChatRequest>) -> Response {
    if !state.has_model(&request.model) {
        return model_not_found(&request.model);
    }
    Json(json!({
        "model": request.model,
        "message": { "role": "assistant", "content": CHAT_REPLY },
        "done": true
    }))
    .into_response()
}

async fn handle_embed(State(state): State<MockState>, Json(request): Json<EmbedRequest>) -> Response {
    if !state.has_model(&request.model) {
        return model_not_found(&request.model);
    }
    let embeddings: Vec<Vec<f32>> = request
        .input
        .iter()
        .map(|text| state.embedder.embed_text(text))
        .collect();
    Json(json!({ "model": request.model, "embeddings": embeddings })).into_response()
}
