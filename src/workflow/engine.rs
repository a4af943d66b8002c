//! The workflow engine.
//!
//! A fixed linear state machine:
//!
//! ```text
//! Init -> Profiled -> Insighted -> PlottedNumerical -> PlottedCategorical
//!      -> PlottedCorrelation -> Done
//! ```
//!
//! Steps run strictly one after another over a single [`WorkflowState`].
//! The first failing step aborts the run.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::caption::CaptionGenerator;
use super::insights::InsightSynthesizer;
use super::plots::{CategoricalFrequencies, CorrelationMatrix, NumericalDistributions, PlotContext, PlotStep};
use super::state::WorkflowState;
use crate::config::Config;
use crate::dataset;
use crate::embeddings::{self, EmbeddingBackend};
use crate::error::{EdaError, Result};
use crate::knowledge::{Retriever, RetrieverSettings};
use crate::llm::{self, LanguageModel};
use crate::models::AnalysisResult;
use crate::profiler;
use crate::render::{Renderer, VegaLiteRenderer};

/// Position of a run in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Profiled,
    Insighted,
    PlottedNumerical,
    PlottedCategorical,
    PlottedCorrelation,
    Done,
}

impl Stage {
    /// The stage after this one. `Done` is terminal.
    pub fn next(self) -> Stage {
        match self {
            Stage::Init => Stage::Profiled,
            Stage::Profiled => Stage::Insighted,
            Stage::Insighted => Stage::PlottedNumerical,
            Stage::PlottedNumerical => Stage::PlottedCategorical,
            Stage::PlottedCategorical => Stage::PlottedCorrelation,
            Stage::PlottedCorrelation | Stage::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Runs the EDA pipeline over datasets.
pub struct WorkflowEngine {
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn EmbeddingBackend>,
    renderer: Arc<dyn Renderer>,
    retrieval: Option<RetrieverSettings>,
    output_dir: PathBuf,
}

impl WorkflowEngine {
    /// Assemble an engine from already-built backends.
    pub fn new(
        config: &Config,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn EmbeddingBackend>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let retrieval = config
            .retrieval
            .enabled
            .then(|| RetrieverSettings::from_config(config));

        Self {
            llm,
            embedder,
            renderer,
            retrieval,
            output_dir: PathBuf::from(&config.general.output_dir),
        }
    }

    /// Build the configured backends and verify they are reachable.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        let llm = llm::from_config(&config.model)?;
        info!("🔎 Checking {} model {}...", llm.backend(), llm.model());
        llm.health_check().await?;

        let embedder = embeddings::from_config(&config.embedding)?;
        if config.retrieval.enabled {
            info!("🔎 Checking embedding model {}...", embedder.model_name());
            embedder.health_check().await?;
        }

        Ok(Self::new(
            config,
            llm,
            embedder,
            Arc::new(VegaLiteRenderer::new()),
        ))
    }

    /// Delete and rebuild the knowledge index on the next run.
    pub fn rebuild_index(mut self, rebuild: bool) -> Self {
        if let Some(ref mut settings) = self.retrieval {
            settings.rebuild = rebuild;
        }
        self
    }

    /// Draw a progress bar while building the knowledge index.
    pub fn show_progress(mut self, show: bool) -> Self {
        if let Some(ref mut settings) = self.retrieval {
            settings.show_progress = show;
        }
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<backend>/<model>` of the language model.
    pub fn model_label(&self) -> String {
        format!("{}/{}", self.llm.backend(), self.llm.model())
    }

    /// Embedding model name, or `None` when retrieval is disabled.
    pub fn embedding_model(&self) -> Option<&str> {
        self.retrieval
            .as_ref()
            .map(|_| self.embedder.model_name())
    }

    /// Run the pipeline on the CSV at `dataset_path`.
    pub async fn run(&self, dataset_path: &Path, target_column: Option<&str>) -> Result<AnalysisResult> {
        check_readable(dataset_path)?;

        let dataset = dataset::load(dataset_path)?;
        if let Some(target) = target_column {
            if dataset.column(target).is_none() {
                warn!("Target column '{}' is not in the dataset", target);
            }
        }

        let retriever = match self.retrieval {
            Some(ref settings) => Some(
                Retriever::ensure_ready(settings, Arc::clone(&self.embedder))
                    .await
                    .map_err(|e| e.in_step("build_retriever"))?,
            ),
            None => None,
        };

        let mut state = WorkflowState::new(dataset_path, target_column.map(String::from));
        let insights = InsightSynthesizer::new(Arc::clone(&self.llm));
        let captions = CaptionGenerator::new(Arc::clone(&self.llm));
        let ctx = PlotContext {
            dataset: &dataset,
            renderer: self.renderer.as_ref(),
            output_dir: &self.output_dir,
            captions: &captions,
        };

        let mut stage = Stage::Init;
        while stage != Stage::Done {
            match stage {
                Stage::Init => {
                    let profile = profiler::profile(&dataset);
                    info!(
                        "🔍 Profiled {} numerical, {} categorical, {} datetime columns",
                        profile.numerical.len(),
                        profile.categorical.len(),
                        profile.datetime.len()
                    );
                    state
                        .set_profile(profile)
                        .map_err(|e| e.in_step("profile_data_for_plotting"))?;
                }
                Stage::Profiled => insights
                    .run(&mut state, retriever.as_ref())
                    .await
                    .map_err(|e| e.in_step("get_contextual_insights"))?,
                Stage::Insighted => NumericalDistributions.run(&ctx, &mut state).await?,
                Stage::PlottedNumerical => CategoricalFrequencies.run(&ctx, &mut state).await?,
                Stage::PlottedCategorical => CorrelationMatrix.run(&ctx, &mut state).await?,
                Stage::PlottedCorrelation | Stage::Done => {}
            }
            stage = stage.next();
            debug!("Workflow stage: {}", stage);
        }

        let summary = dataset.summary();
        let (profile, insights, visualizations) = state.into_outputs();
        let columns = profile
            .ok_or_else(|| EdaError::StateViolation("run finished without a column profile".to_string()))?;

        info!(
            "✅ Analysis complete: {} visualizations, {} insights",
            visualizations.len(),
            insights.len()
        );

        Ok(AnalysisResult {
            dataset_path: dataset_path.display().to_string(),
            target_column: target_column.map(String::from),
            summary,
            columns,
            insights,
            visualizations,
        })
    }
}

/// The dataset path must name an existing, readable file.
fn check_readable(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(EdaError::InvalidInput(format!(
            "Dataset not found: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(EdaError::InvalidInput(format!(
            "Dataset path is not a file: {}",
            path.display()
        )));
    }
    File::open(path).map_err(|e| {
        EdaError::InvalidInput(format!("Dataset is not readable: {}: {}", path.display(), e))
    })?;
    Ok(())
}
