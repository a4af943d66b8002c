//! Data models shared across the pipeline.
//!
//! This module contains the documents served by the knowledge store, the
//! plot/caption records produced by the workflow, and the final result
//! handed back to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of the knowledge store. Immutable once indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text content (a chunk of one corpus row).
    pub content: String,
    /// 0-based index of the corpus row this chunk came from.
    pub source_row: usize,
}

/// Kind of chart a plot step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    /// Histogram stacked over a box plot, one per numerical column.
    HistogramBox,
    /// Frequency bar chart, one per categorical column.
    FrequencyBar,
    /// Correlation heatmap over all numerical columns.
    CorrelationHeatmap,
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotKind::HistogramBox => write!(f, "Histogram and Box Plot"),
            PlotKind::FrequencyBar => write!(f, "Bar Chart"),
            PlotKind::CorrelationHeatmap => write!(f, "Correlation Heatmap"),
        }
    }
}

/// The most recently produced plot, waiting for its caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPlotContext {
    pub plot_kind: PlotKind,
    /// Human-readable description of what was plotted,
    /// e.g. "the numerical column 'age'".
    pub subject_description: String,
}

/// Output of the caption generator for one pending plot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionedPlot {
    pub plot_kind: PlotKind,
    pub subject_description: String,
    pub caption: String,
}

/// A captioned plot artifact. `caption` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationRecord {
    pub title: String,
    /// File name of the artifact inside the plot output directory.
    pub artifact_path: String,
    pub plot_kind: PlotKind,
    pub caption: String,
}

/// Column partition computed by the profiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub numerical: Vec<String>,
    pub categorical: Vec<String>,
    pub datetime: Vec<String>,
}

impl ColumnProfile {
    /// Total number of classified columns.
    pub fn len(&self) -> usize {
        self.numerical.len() + self.categorical.len() + self.datetime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Basic shape of the analysed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub column_count: usize,
    /// Estimated in-memory size of the loaded columns.
    pub memory_bytes: usize,
}

impl DatasetSummary {
    /// Memory footprint formatted in kilobytes, e.g. "12.34 KB".
    pub fn memory_footprint(&self) -> String {
        format!("{:.2} KB", self.memory_bytes as f64 / 1024.0)
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub dataset_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
    pub summary: DatasetSummary,
    pub columns: ColumnProfile,
    pub insights: Vec<String>,
    pub visualizations: Vec<VisualizationRecord>,
}

/// Run metadata shown at the top of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub dataset: String,
    pub analysis_date: DateTime<Utc>,
    /// `<backend>/<model>` of the language model.
    pub model_used: String,
    /// `None` when retrieval was disabled.
    pub embedding_model: Option<String>,
    pub duration_seconds: f64,
}

/// A finished run plus its metadata, ready to be written out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub result: AnalysisResult,
}
