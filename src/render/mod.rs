//! Plot rendering.
//!
//! The workflow hands a [`PlotSpec`] to a [`Renderer`] and only keeps the
//! returned artifact file name. The default renderer writes Vega-Lite chart
//! specifications that any Vega viewer can display.

mod vega_lite;

pub use vega_lite::VegaLiteRenderer;

use std::path::Path;

use crate::error::Result;
use crate::models::PlotKind;

/// Data for one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotSpec {
    /// Histogram stacked over a box plot. Missing cells already removed.
    HistogramBox { column: String, values: Vec<f64> },
    /// Category counts, most frequent first.
    Frequency {
        column: String,
        counts: Vec<(String, usize)>,
    },
    /// Square correlation matrix over `columns`; `None` where undefined.
    CorrelationHeatmap {
        columns: Vec<String>,
        matrix: Vec<Vec<Option<f64>>>,
    },
}

impl PlotSpec {
    pub fn kind(&self) -> PlotKind {
        match self {
            PlotSpec::HistogramBox { .. } => PlotKind::HistogramBox,
            PlotSpec::Frequency { .. } => PlotKind::FrequencyBar,
            PlotSpec::CorrelationHeatmap { .. } => PlotKind::CorrelationHeatmap,
        }
    }

    /// Chart title.
    pub fn title(&self) -> String {
        match self {
            PlotSpec::HistogramBox { column, .. } => format!("Distribution of {}", column),
            PlotSpec::Frequency { column, .. } => format!("Frequency of {}", column),
            PlotSpec::CorrelationHeatmap { .. } => "Correlation Heatmap".to_string(),
        }
    }

    /// Base file stem. Callers make it unique per run before rendering.
    pub fn file_stem(&self) -> String {
        match self {
            PlotSpec::HistogramBox { column, .. } => format!("hist_box_{}", slugify(column)),
            PlotSpec::Frequency { column, .. } => format!("countplot_{}", slugify(column)),
            PlotSpec::CorrelationHeatmap { .. } => "correlation_heatmap".to_string(),
        }
    }
}

/// Renders a chart and saves it under an output directory.
pub trait Renderer: Send + Sync {
    /// Render `spec` into `output_dir` as `file_stem` plus the renderer's
    /// extension, returning the artifact's file name.
    fn render(&self, spec: &PlotSpec, file_stem: &str, output_dir: &Path) -> Result<String>;
}

/// Lowercase ASCII alphanumerics, runs of anything else collapsed to `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "column".to_string()
    } else {
        slug.to_string()
    }
}
