//! Caption generation for freshly rendered plots.

use std::sync::Arc;

use tracing::info;

use super::state::WorkflowState;
use crate::error::{EdaError, Result};
use crate::llm::LanguageModel;
use crate::models::{CaptionedPlot, PendingPlotContext};

/// Caption prompt. `{plot_kind}` and `{subject}` are filled per plot.
const CAPTION_PROMPT: &str = r#"You are an expert data analyst providing insights for a presentation.
A {plot_kind} has been generated for {subject}.
Your task is to write a single, concise, and insightful caption for this plot.
The caption should explain the key takeaway or what the visualization reveals about the data.
Start your caption directly, without any preamble like "This plot shows...".

Example for a histogram of 'age':
"The age distribution is skewed towards a younger demographic, with a significant peak in the 20-30 year old range."

Example for a correlation heatmap:
"Price shows a strong positive correlation with sqft_living and grade, indicating these are key drivers of value, while yr_built has a weaker relationship."
"#;

/// Turns the pending plot context into a caption with one model call.
pub struct CaptionGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl CaptionGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Caption the pending plot and clear the slot. Returns `Ok(None)`
    /// without calling the model when nothing is pending.
    pub async fn generate(&self, state: &mut WorkflowState) -> Result<Option<CaptionedPlot>> {
        let Some(context) = state.take_pending() else {
            return Ok(None);
        };

        let reply = self.llm.invoke(&build_prompt(&context)).await?;
        let caption = clean_caption(&reply);
        if caption.is_empty() {
            return Err(EdaError::ModelInvocation(format!(
                "{} returned an empty caption for {}",
                self.llm.model(),
                context.subject_description
            )));
        }

        info!("💡 Caption for {}: {}", context.subject_description, caption);

        Ok(Some(CaptionedPlot {
            plot_kind: context.plot_kind,
            subject_description: context.subject_description,
            caption,
        }))
    }
}

fn build_prompt(context: &PendingPlotContext) -> String {
    CAPTION_PROMPT
        .replace("{plot_kind}", &context.plot_kind.to_string())
        .replace("{subject}", &context.subject_description)
}

/// Trim whitespace. A reply that is one quoted span loses its quotes;
/// quotes around individual words are left alone.
fn clean_caption(reply: &str) -> String {
    let trimmed = reply.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|inner| !inner.contains('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockModel;
    use crate::models::PlotKind;
    use std::path::Path;

    #[tokio::test]
    async fn test_no_pending_context_skips_model() {
        let model = MockModel::new();
        let generator = CaptionGenerator::new(Arc::new(model.clone()));
        let mut state = WorkflowState::new(Path::new("data.csv"), None);

        assert!(generator.generate(&mut state).await.unwrap().is_none());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_caption_is_trimmed_and_slot_cleared() {
        let model = MockModel::with_reply("  \"Most customers are under 40.\"\n");
        let generator = CaptionGenerator::new(Arc::new(model.clone()));
        let mut state = WorkflowState::new(Path::new("data.csv"), None);
        state.set_pending(PendingPlotContext {
            plot_kind: PlotKind::HistogramBox,
            subject_description: "the numerical column 'age'".to_string(),
        });

        let captioned = generator.generate(&mut state).await.unwrap().unwrap();
        assert_eq!(captioned.caption, "Most customers are under 40.");
        assert_eq!(captioned.plot_kind, PlotKind::HistogramBox);
        assert!(!state.has_pending());

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("A Histogram and Box Plot has been generated for the numerical column 'age'."));
    }

    #[tokio::test]
    async fn test_quoted_words_are_kept() {
        let reply = "\"Price\" rises sharply with \"grade\"";
        let generator = CaptionGenerator::new(Arc::new(MockModel::with_reply(reply)));
        let mut state = WorkflowState::new(Path::new("data.csv"), None);
        state.set_pending(PendingPlotContext {
            plot_kind: PlotKind::CorrelationHeatmap,
            subject_description: "all numerical features".to_string(),
        });

        let captioned = generator.generate(&mut state).await.unwrap().unwrap();
        assert_eq!(captioned.caption, reply);
    }

    #[test]
    fn test_clean_caption() {
        assert_eq!(clean_caption("  plain text \n"), "plain text");
        assert_eq!(clean_caption("\"wrapped\""), "wrapped");
        assert_eq!(clean_caption("\"a\" and \"b\""), "\"a\" and \"b\"");
        assert_eq!(clean_caption("\""), "\"");
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        let generator = CaptionGenerator::new(Arc::new(MockModel::with_reply("   ")));
        let mut state = WorkflowState::new(Path::new("data.csv"), None);
        state.set_pending(PendingPlotContext {
            plot_kind: PlotKind::FrequencyBar,
            subject_description: "the categorical column 'city'".to_string(),
        });

        let err = generator.generate(&mut state).await.unwrap_err();
        assert!(matches!(err, EdaError::ModelInvocation(_)));
    }
}
