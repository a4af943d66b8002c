//! edaflow - automated exploratory data analysis.
//!
//! The [`workflow::WorkflowEngine`] loads a CSV dataset, partitions its
//! columns, asks a language model for analysis suggestions grounded in a
//! local knowledge base, renders one chart per column (plus a correlation
//! heatmap) and has the model caption every chart.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod ollama;
pub mod profiler;
pub mod render;
pub mod report;
pub mod workflow;

#[cfg(test)]
mod test_support;
