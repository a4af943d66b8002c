//! Mock language model for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::LanguageModel;
use crate::error::{EdaError, Result};

const DEFAULT_REPLY: &str = "The data shows a clear pattern worth a closer look.";

/// Returns canned replies and records every prompt it receives.
///
/// Replies queued with [`MockModel::push_reply`] are returned first, in
/// order; after that every call gets the default reply.
#[derive(Clone)]
pub struct MockModel {
    default_reply: String,
    queued: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
    healthy: bool,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            default_reply: DEFAULT_REPLY.to_string(),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            healthy: true,
        }
    }

    /// A mock whose every reply is `reply`.
    pub fn with_reply(reply: &str) -> Self {
        Self {
            default_reply: reply.to_string(),
            ..Self::new()
        }
    }

    /// A mock whose every invocation fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// A mock whose health check fails.
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    pub fn push_reply(&self, reply: &str) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(reply.to_string());
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(ref message) = self.failure {
            return Err(EdaError::ModelInvocation(message.clone()));
        }

        let queued = self.queued.lock().ok().and_then(|mut q| q.pop_front());
        Ok(queued.unwrap_or_else(|| self.default_reply.clone()))
    }

    async fn health_check(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(EdaError::ModelServiceUnreachable {
                backend: "mock".to_string(),
                url: "mock://".to_string(),
            })
        }
    }

    fn backend(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}
