//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Flags left unset fall back to the config file.

use clap::Parser;
use std::path::PathBuf;

/// edaflow - automated exploratory data analysis
///
/// Profiles a CSV dataset, pulls matching techniques from a local
/// knowledge base, renders distribution, frequency and correlation
/// charts, and captions each one with an LLM.
///
/// Examples:
///   edaflow --data customers.csv
///   edaflow --data customers.csv --target churn --backend ollama --model qwen3:4b
///   edaflow --data customers.csv --no-retrieval --format json --output report.json
///   edaflow --data customers.csv --dry-run
///   edaflow --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV dataset to analyze
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub data: Option<PathBuf>,

    /// Target column of interest (recorded in the report)
    #[arg(short, long, value_name = "COLUMN")]
    pub target: Option<String>,

    /// Language model backend (groq, ollama, openai_compatible, mock)
    #[arg(short, long, env = "EDAFLOW_BACKEND")]
    pub backend: Option<String>,

    /// Language model name
    ///
    /// Defaults per backend: llama-3.1-8b-instant for groq, qwen3:4b for ollama.
    #[arg(short, long, env = "EDAFLOW_MODEL")]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds for model and embedding calls
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Ollama API endpoint URL (chat and embeddings)
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Embedding backend (ollama, hashing)
    #[arg(long)]
    pub embedding_backend: Option<String>,

    /// Embedding model used to index and query the knowledge base
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Knowledge base CSV
    #[arg(long, value_name = "FILE")]
    pub knowledge_base: Option<PathBuf>,

    /// Directory holding the persisted vector index
    #[arg(long, value_name = "DIR")]
    pub index_path: Option<PathBuf>,

    /// Number of techniques retrieved per query
    #[arg(long, value_name = "K")]
    pub top_k: Option<usize>,

    /// Skip the knowledge base entirely
    #[arg(long)]
    pub no_retrieval: bool,

    /// Delete and rebuild the vector index before the run
    #[arg(long, conflicts_with = "no_retrieval")]
    pub rebuild_index: bool,

    /// Directory for plot artifacts
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .edaflow.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and profile the dataset without calling any model
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .edaflow.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.top_k == Some(0) {
            return Err("--top-k must be at least 1".to_string());
        }

        if let Some(ref data) = self.data {
            if data.is_dir() {
                return Err(format!("Dataset path is a directory: {}", data.display()));
            }
        }

        Ok(())
    }
}
