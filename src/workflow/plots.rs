//! Plot steps.
//!
//! Every step renders its charts one at a time. After each chart the step
//! fills the pending plot slot, has it captioned, and appends the captioned
//! record, so the slot never holds more than one plot.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use super::caption::CaptionGenerator;
use super::state::WorkflowState;
use crate::dataset::{Column, Dataset};
use crate::error::{EdaError, Result};
use crate::models::{PendingPlotContext, VisualizationRecord};
use crate::render::{PlotSpec, Renderer};

/// What a plot step needs besides the state.
pub struct PlotContext<'a> {
    pub dataset: &'a Dataset,
    pub renderer: &'a dyn Renderer,
    pub output_dir: &'a Path,
    pub captions: &'a CaptionGenerator,
}

/// One plotting stage of the workflow.
#[async_trait]
pub trait PlotStep: Send + Sync {
    /// Step name used in logs and error context.
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &PlotContext<'_>, state: &mut WorkflowState) -> Result<()>;
}

/// Histogram and box plot for every numerical column.
pub struct NumericalDistributions;

/// Frequency bar chart for every categorical column.
pub struct CategoricalFrequencies;

/// One correlation heatmap over all numerical columns (needs at least two).
pub struct CorrelationMatrix;

#[async_trait]
impl PlotStep for NumericalDistributions {
    fn name(&self) -> &'static str {
        "plot_univariate_numerical"
    }

    async fn run(&self, ctx: &PlotContext<'_>, state: &mut WorkflowState) -> Result<()> {
        let columns = state.profile()?.numerical.clone();
        if columns.is_empty() {
            debug!("No numerical columns; skipping distributions");
            return Ok(());
        }

        for name in &columns {
            let result: Result<()> = async {
                let values = numeric_column(ctx.dataset, name)?
                    .iter()
                    .flatten()
                    .copied()
                    .filter(|v| v.is_finite())
                    .collect();
                let spec = PlotSpec::HistogramBox {
                    column: name.clone(),
                    values,
                };
                render_and_caption(ctx, state, spec, format!("the numerical column '{}'", name))
                    .await
            }
            .await;
            result.map_err(|e| e.for_column(self.name(), name))?;
        }
        Ok(())
    }
}

#[async_trait]
impl PlotStep for CategoricalFrequencies {
    fn name(&self) -> &'static str {
        "plot_univariate_categorical"
    }

    async fn run(&self, ctx: &PlotContext<'_>, state: &mut WorkflowState) -> Result<()> {
        let columns = state.profile()?.categorical.clone();
        if columns.is_empty() {
            debug!("No categorical columns; skipping frequencies");
            return Ok(());
        }

        for name in &columns {
            let result: Result<()> = async {
                let column = find_column(ctx.dataset, name)?;
                let spec = PlotSpec::Frequency {
                    column: name.clone(),
                    counts: value_counts(column),
                };
                render_and_caption(ctx, state, spec, format!("the categorical column '{}'", name))
                    .await
            }
            .await;
            result.map_err(|e| e.for_column(self.name(), name))?;
        }
        Ok(())
    }
}

#[async_trait]
impl PlotStep for CorrelationMatrix {
    fn name(&self) -> &'static str {
        "plot_correlation_heatmap"
    }

    async fn run(&self, ctx: &PlotContext<'_>, state: &mut WorkflowState) -> Result<()> {
        let columns = state.profile()?.numerical.clone();
        if columns.len() < 2 {
            debug!(
                "{} numerical column(s); skipping correlation heatmap",
                columns.len()
            );
            return Ok(());
        }

        let result: Result<()> = async {
            let series = columns
                .iter()
                .map(|name| numeric_column(ctx.dataset, name))
                .collect::<Result<Vec<_>>>()?;
            let spec = PlotSpec::CorrelationHeatmap {
                columns: columns.clone(),
                matrix: correlation_matrix(&series),
            };
            render_and_caption(ctx, state, spec, "all numerical features".to_string()).await
        }
        .await;
        result.map_err(|e| e.in_step(self.name()))
    }
}

/// Render `spec`, caption it through the pending slot, and record it.
async fn render_and_caption(
    ctx: &PlotContext<'_>,
    state: &mut WorkflowState,
    spec: PlotSpec,
    subject_description: String,
) -> Result<()> {
    let file_stem = state.claim_file_stem(&spec.file_stem());
    let artifact_path = ctx.renderer.render(&spec, &file_stem, ctx.output_dir)?;
    info!("📊 Saved {}", artifact_path);

    state.set_pending(PendingPlotContext {
        plot_kind: spec.kind(),
        subject_description,
    });

    let captioned = ctx
        .captions
        .generate(state)
        .await?
        .ok_or_else(|| EdaError::StateViolation("plot context vanished before captioning".to_string()))?;

    state.push_visualization(VisualizationRecord {
        title: spec.title(),
        artifact_path,
        plot_kind: captioned.plot_kind,
        caption: captioned.caption,
    })
}

fn find_column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column> {
    dataset
        .column(name)
        .ok_or_else(|| EdaError::StateViolation(format!("column '{}' is not in the dataset", name)))
}

fn numeric_column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a [Option<f64>]> {
    find_column(dataset, name)?
        .numeric_values()
        .ok_or_else(|| EdaError::StateViolation(format!("column '{}' is not numeric", name)))
}

/// Non-missing value counts, most frequent first, ties in name order.
pub fn value_counts(column: &Column) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column.display_values().into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Pearson correlation over rows where both values are present. `None`
/// when fewer than two such rows exist or either side is constant.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Square matrix of pairwise Pearson coefficients.
pub fn correlation_matrix(series: &[&[Option<f64>]]) -> Vec<Vec<Option<f64>>> {
    series
        .iter()
        .map(|a| series.iter().map(|b| pearson(a, b)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::llm::MockModel;
    use crate::models::{ColumnProfile, PlotKind};
    use crate::render::VegaLiteRenderer;
    use std::sync::Arc;

    fn dataset(csv: &str) -> Dataset {
        Dataset::from_reader(csv.as_bytes(), Path::new("test.csv")).unwrap()
    }

    fn state_with(numerical: &[&str], categorical: &[&str]) -> WorkflowState {
        let mut state = WorkflowState::new(Path::new("test.csv"), None);
        state
            .set_profile(ColumnProfile {
                numerical: numerical.iter().map(|s| s.to_string()).collect(),
                categorical: categorical.iter().map(|s| s.to_string()).collect(),
                datetime: vec![],
            })
            .unwrap();
        state
    }

    #[test]
    fn test_pearson() {
        let a = [Some(1.0), Some(2.0), Some(3.0), None];
        let b = [Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        let c = [Some(3.0), Some(2.0), Some(1.0), Some(0.0)];
        let flat = [Some(5.0), Some(5.0), Some(5.0), Some(5.0)];

        assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&a, &flat), None);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);

        let series: [&[Option<f64>]; 2] = [&a, &flat];
        let matrix = correlation_matrix(&series);
        assert!((matrix[0][0].unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(matrix[1][1], None);
    }

    #[test]
    fn test_value_counts_order() {
        let data = dataset("city\nParis\nLyon\nParis\n\nNice\nLyon\nParis\n");
        let counts = value_counts(data.column("city").unwrap());
        assert_eq!(
            counts,
            vec![
                ("Paris".to_string(), 3),
                ("Lyon".to_string(), 2),
                ("Nice".to_string(), 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_steps_append_captioned_records() {
        let data = dataset("age,income,city\n21,1000,Paris\n35,2500,Lyon\n42,3100,Paris\n");
        let out = tempfile::tempdir().unwrap();
        let model = MockModel::new();
        let captions = CaptionGenerator::new(Arc::new(model.clone()));
        let renderer = VegaLiteRenderer::new();
        let ctx = PlotContext {
            dataset: &data,
            renderer: &renderer,
            output_dir: out.path(),
            captions: &captions,
        };
        let mut state = state_with(&["age", "income"], &["city"]);

        NumericalDistributions.run(&ctx, &mut state).await.unwrap();
        CategoricalFrequencies.run(&ctx, &mut state).await.unwrap();
        CorrelationMatrix.run(&ctx, &mut state).await.unwrap();

        let titles: Vec<&str> = state.visualizations().iter().map(|v| v.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Distribution of age",
                "Distribution of income",
                "Frequency of city",
                "Correlation Heatmap"
            ]
        );
        assert_eq!(state.visualizations()[3].plot_kind, PlotKind::CorrelationHeatmap);
        assert!(state.visualizations().iter().all(|v| !v.caption.is_empty()));
        assert!(out.path().join("correlation_heatmap.vl.json").exists());
        assert_eq!(model.call_count(), 4);
        assert!(!state.has_pending());
    }

    #[tokio::test]
    async fn test_colliding_column_names_get_distinct_artifacts() {
        let data = dataset("Age,age\n1,100\n2,200\n3,300\n");
        let out = tempfile::tempdir().unwrap();
        let captions = CaptionGenerator::new(Arc::new(MockModel::new()));
        let renderer = VegaLiteRenderer::new();
        let ctx = PlotContext {
            dataset: &data,
            renderer: &renderer,
            output_dir: out.path(),
            captions: &captions,
        };
        let mut state = state_with(&["Age", "age"], &[]);

        NumericalDistributions.run(&ctx, &mut state).await.unwrap();

        let artifacts: Vec<&str> = state
            .visualizations()
            .iter()
            .map(|v| v.artifact_path.as_str())
            .collect();
        assert_eq!(artifacts, vec!["hist_box_age.vl.json", "hist_box_age_2.vl.json"]);

        for record in state.visualizations() {
            let written: serde_json::Value = serde_json::from_str(
                &std::fs::read_to_string(out.path().join(&record.artifact_path)).unwrap(),
            )
            .unwrap();
            assert_eq!(written["title"], record.title.as_str());
        }
    }

    #[tokio::test]
    async fn test_correlation_needs_two_columns() {
        let data = dataset("age\n1\n2\n");
        let out = tempfile::tempdir().unwrap();
        let model = MockModel::new();
        let captions = CaptionGenerator::new(Arc::new(model.clone()));
        let renderer = VegaLiteRenderer::new();
        let ctx = PlotContext {
            dataset: &data,
            renderer: &renderer,
            output_dir: out.path(),
            captions: &captions,
        };
        let mut state = state_with(&["age"], &[]);

        CorrelationMatrix.run(&ctx, &mut state).await.unwrap();
        CategoricalFrequencies.run(&ctx, &mut state).await.unwrap();
        assert!(state.visualizations().is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_caption_failure_names_step_and_column() {
        let data = dataset("age\n1\n2\n");
        let out = tempfile::tempdir().unwrap();
        let captions = CaptionGenerator::new(Arc::new(MockModel::failing("rate limited")));
        let renderer = VegaLiteRenderer::new();
        let ctx = PlotContext {
            dataset: &data,
            renderer: &renderer,
            output_dir: out.path(),
            captions: &captions,
        };
        let mut state = state_with(&["age"], &[]);

        let err = NumericalDistributions.run(&ctx, &mut state).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("plot_univariate_numerical"));
        assert!(message.contains("column 'age'"));
        assert!(matches!(err.root(), EdaError::ModelInvocation(_)));
        assert!(state.visualizations().is_empty());
    }
}
