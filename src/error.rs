//! Error types for edaflow.
//!
//! Every failure the engine can surface is an [`EdaError`]. Variants are
//! grouped into a small set of [`ErrorKind`]s so callers can decide how to
//! present a failure without matching on every variant.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of an [`EdaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing dataset path, bad configuration value.
    InvalidInput,
    /// Dataset or knowledge corpus could not be read or parsed.
    DataLoad,
    /// Embedding service unreachable or embedding model not installed.
    EmbeddingBackend,
    /// Language-model call failed.
    ModelInvocation,
    /// Plot artifact could not be produced.
    Rendering,
    /// Broken internal invariant.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "invalid input"),
            ErrorKind::DataLoad => write!(f, "data load error"),
            ErrorKind::EmbeddingBackend => write!(f, "embedding backend error"),
            ErrorKind::ModelInvocation => write!(f, "model invocation error"),
            ErrorKind::Rendering => write!(f, "rendering error"),
            ErrorKind::Internal => write!(f, "internal error"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EdaError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to load '{}': {reason}", .path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("CSV parsing error in '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(
        "Cannot connect to the embedding service at '{url}'. \
         Make sure Ollama is running (start it with `ollama serve`)."
    )]
    EmbeddingServiceUnreachable { url: String },

    #[error(
        "The embedding model '{model}' is not installed on the server at '{url}'. \
         Pull it with `ollama pull {model}`."
    )]
    EmbeddingModelMissing { model: String, url: String },

    #[error("Embedding request failed: {0}")]
    Embedding(String),

    #[error("Cannot connect to the {backend} language-model service at '{url}'")]
    ModelServiceUnreachable { backend: String, url: String },

    #[error("The {backend} backend does not provide the model '{model}'")]
    ModelNotFound { backend: String, model: String },

    #[error("Language-model call failed: {0}")]
    ModelInvocation(String),

    #[error("Failed to render '{artifact}': {reason}")]
    Rendering { artifact: String, reason: String },

    #[error("Vector index at '{}' is unusable: {reason}", .path.display())]
    Index { path: PathBuf, reason: String },

    #[error("Workflow state violation: {0}")]
    StateViolation(String),

    #[error("{step}{}: {source}", .column.as_deref().map(|c| format!(" (column '{c}')")).unwrap_or_default())]
    Step {
        step: &'static str,
        column: Option<String>,
        #[source]
        source: Box<EdaError>,
    },
}

pub type Result<T> = std::result::Result<T, EdaError>;

impl EdaError {
    /// The classification of this error. Step wrappers report the kind of the
    /// error they wrap.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EdaError::InvalidInput(_) => ErrorKind::InvalidInput,
            EdaError::DataLoad { .. } | EdaError::Csv { .. } | EdaError::Index { .. } => {
                ErrorKind::DataLoad
            }
            EdaError::EmbeddingServiceUnreachable { .. }
            | EdaError::EmbeddingModelMissing { .. }
            | EdaError::Embedding(_) => ErrorKind::EmbeddingBackend,
            EdaError::ModelServiceUnreachable { .. }
            | EdaError::ModelNotFound { .. }
            | EdaError::ModelInvocation(_) => ErrorKind::ModelInvocation,
            EdaError::Rendering { .. } => ErrorKind::Rendering,
            EdaError::StateViolation(_) => ErrorKind::Internal,
            EdaError::Step { source, .. } => source.kind(),
        }
    }

    /// Wrap this error with the name of the workflow step it came from.
    pub fn in_step(self, step: &'static str) -> Self {
        EdaError::Step {
            step,
            column: None,
            source: Box::new(self),
        }
    }

    /// Wrap this error with the step and the column being processed.
    pub fn for_column(self, step: &'static str, column: &str) -> Self {
        EdaError::Step {
            step,
            column: Some(column.to_string()),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all step wrappers removed.
    pub fn root(&self) -> &EdaError {
        match self {
            EdaError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EdaError::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn index(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EdaError::Index {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
