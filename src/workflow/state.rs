//! State threaded through one pipeline run.
//!
//! Each field has its own update rule:
//! - dataset path and target column: fixed at construction
//! - column profile: set exactly once
//! - insights and visualizations: append-only
//! - pending plot context: a single slot, filled by a plot step and
//!   emptied by the caption generator; a new plot overwrites it
//! - artifact file stems: each one handed out at most once per run

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{EdaError, Result};
use crate::models::{ColumnProfile, PendingPlotContext, VisualizationRecord};

#[derive(Debug)]
pub struct WorkflowState {
    dataset_path: PathBuf,
    target_column: Option<String>,
    profile: Option<ColumnProfile>,
    insights: Vec<String>,
    visualizations: Vec<VisualizationRecord>,
    pending: Option<PendingPlotContext>,
    file_stems: HashSet<String>,
}

impl WorkflowState {
    pub fn new(dataset_path: &Path, target_column: Option<String>) -> Self {
        Self {
            dataset_path: dataset_path.to_path_buf(),
            target_column,
            profile: None,
            insights: Vec::new(),
            visualizations: Vec::new(),
            pending: None,
            file_stems: HashSet::new(),
        }
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn target_column(&self) -> Option<&str> {
        self.target_column.as_deref()
    }

    /// Record the column partition. Fails if it was already set.
    pub fn set_profile(&mut self, profile: ColumnProfile) -> Result<()> {
        if self.profile.is_some() {
            return Err(EdaError::StateViolation(
                "column profile is already set".to_string(),
            ));
        }
        self.profile = Some(profile);
        Ok(())
    }

    /// The column partition. Fails before profiling.
    pub fn profile(&self) -> Result<&ColumnProfile> {
        self.profile
            .as_ref()
            .ok_or_else(|| EdaError::StateViolation("columns have not been profiled".to_string()))
    }

    pub fn push_insight(&mut self, insight: String) {
        self.insights.push(insight);
    }

    pub fn insights(&self) -> &[String] {
        &self.insights
    }

    /// Append a visualization. Empty captions are rejected.
    pub fn push_visualization(&mut self, record: VisualizationRecord) -> Result<()> {
        if record.caption.trim().is_empty() {
            return Err(EdaError::StateViolation(format!(
                "visualization '{}' has an empty caption",
                record.title
            )));
        }
        self.visualizations.push(record);
        Ok(())
    }

    pub fn visualizations(&self) -> &[VisualizationRecord] {
        &self.visualizations
    }

    /// Fill the pending slot, returning any context it overwrote.
    pub fn set_pending(&mut self, context: PendingPlotContext) -> Option<PendingPlotContext> {
        let previous = self.pending.replace(context);
        if let Some(ref previous) = previous {
            warn!(
                "Dropping uncaptioned {} for {}",
                previous.plot_kind, previous.subject_description
            );
        }
        previous
    }

    /// Empty the pending slot, returning what it held.
    pub fn take_pending(&mut self) -> Option<PendingPlotContext> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Reserve an artifact file stem for this run. A stem that is already
    /// taken gets `_2`, `_3`, ... appended until it is free.
    pub fn claim_file_stem(&mut self, stem: &str) -> String {
        let mut candidate = stem.to_string();
        let mut n = 1;
        while self.file_stems.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", stem, n);
        }
        self.file_stems.insert(candidate.clone());
        candidate
    }

    /// Consume the state, keeping the accumulated outputs.
    pub fn into_outputs(self) -> (Option<ColumnProfile>, Vec<String>, Vec<VisualizationRecord>) {
        (self.profile, self.insights, self.visualizations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlotKind;

    fn pending(subject: &str) -> PendingPlotContext {
        PendingPlotContext {
            plot_kind: PlotKind::HistogramBox,
            subject_description: subject.to_string(),
        }
    }

    #[test]
    fn test_profile_set_once() {
        let mut state = WorkflowState::new(Path::new("data.csv"), None);
        assert!(state.profile().is_err());

        state.set_profile(ColumnProfile::default()).unwrap();
        assert!(state.profile().is_ok());
        assert!(matches!(
            state.set_profile(ColumnProfile::default()),
            Err(EdaError::StateViolation(_))
        ));
    }

    #[test]
    fn test_pending_is_single_slot() {
        let mut state = WorkflowState::new(Path::new("data.csv"), None);
        assert_eq!(state.set_pending(pending("age")), None);
        assert_eq!(state.set_pending(pending("income")), Some(pending("age")));

        assert_eq!(state.take_pending(), Some(pending("income")));
        assert!(!state.has_pending());
        assert_eq!(state.take_pending(), None);
    }

    #[test]
    fn test_visualizations_need_captions() {
        let mut state = WorkflowState::new(Path::new("data.csv"), Some("churn".to_string()));
        let mut record = VisualizationRecord {
            title: "Distribution of age".to_string(),
            artifact_path: "hist_box_age.vl.json".to_string(),
            plot_kind: PlotKind::HistogramBox,
            caption: "  ".to_string(),
        };
        assert!(state.push_visualization(record.clone()).is_err());

        record.caption = "Ages skew young.".to_string();
        state.push_visualization(record).unwrap();
        assert_eq!(state.visualizations().len(), 1);
        assert_eq!(state.target_column(), Some("churn"));
    }

    #[test]
    fn test_file_stems_are_unique() {
        let mut state = WorkflowState::new(Path::new("data.csv"), None);
        assert_eq!(state.claim_file_stem("hist_box_age"), "hist_box_age");
        assert_eq!(state.claim_file_stem("hist_box_age"), "hist_box_age_2");
        assert_eq!(state.claim_file_stem("countplot_age"), "countplot_age");
        assert_eq!(state.claim_file_stem("hist_box_age"), "hist_box_age_3");
    }
}
