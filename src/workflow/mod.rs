//! The analysis workflow: profiling, contextual insights, plots and captions
//! run in a fixed order over one shared state.

mod caption;
mod engine;
mod insights;
mod plots;
mod state;

pub use caption::CaptionGenerator;
pub use engine::{Stage, WorkflowEngine};
pub use insights::{InsightSynthesizer, RETRIEVER_UNAVAILABLE};
pub use plots::{
    correlation_matrix, pearson, value_counts, CategoricalFrequencies, CorrelationMatrix,
    NumericalDistributions, PlotContext, PlotStep,
};
pub use state::WorkflowState;
