//! Contextual insights from the knowledge base.

use std::sync::Arc;

use tracing::{info, warn};

use super::state::WorkflowState;
use crate::error::Result;
use crate::knowledge::Retriever;
use crate::llm::LanguageModel;

/// Insight recorded when no retriever was configured.
pub const RETRIEVER_UNAVAILABLE: &str = "Retriever not available.";

const SYNTHESIS_PROMPT: &str = r#"Based on the following data analysis techniques, provide a concise summary of 2-3 key suggestions for an analyst.
Focus on actionable advice.

Retrieved Techniques:
{context}

Summary:
"#;

/// Retrieves techniques that fit the dataset's column shapes and asks the
/// model to condense them into a few suggestions.
pub struct InsightSynthesizer {
    llm: Arc<dyn LanguageModel>,
}

impl InsightSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Append exactly one insight to `state`.
    pub async fn run(&self, state: &mut WorkflowState, retriever: Option<&Retriever>) -> Result<()> {
        let Some(retriever) = retriever else {
            warn!("No retriever configured; skipping contextual insights");
            state.push_insight(RETRIEVER_UNAVAILABLE.to_string());
            return Ok(());
        };

        let profile = state.profile()?;
        let query = build_query(&profile.numerical, &profile.categorical);

        let documents = retriever.query(&query).await?;
        info!("🤔 Retrieved {} techniques from the knowledge base", documents.len());

        let context = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let reply = self
            .llm
            .invoke(&SYNTHESIS_PROMPT.replace("{context}", &context))
            .await?;
        state.push_insight(reply.trim().to_string());
        Ok(())
    }
}

fn build_query(numerical: &[String], categorical: &[String]) -> String {
    format!(
        "What are some common data analysis and visualization techniques \
         for a dataset with numerical columns like {:?} and categorical columns like {:?}?",
        numerical, categorical
    )
}
