//! Error types for the RAG pipeline and evaluator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur anywhere in the predict/evaluate flow.
#[derive(Error, Debug)]
pub enum RagError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset file is unreadable or not a JSON array of records.
    #[error("Failed to load dataset: {0}")]
    Load(String),

    /// Embedding or index insertion failed while building a report index.
    #[error("Index build failed: {0}")]
    IndexBuild(String),

    /// Similarity search or table lookup failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// The language model call failed or returned nothing usable.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The grading model response lacked a valid score or explanation.
    #[error("Malformed grading response: {0}")]
    MalformedGradingResponse(String),

    /// A record is missing a field required at this stage.
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    /// A pipeline stage was invoked from the wrong state.
    #[error("Pipeline state error: {0}")]
    Pipeline(String),

    /// Error during serialization/deserialization of output tables.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Embedding service error.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::LlmParse(err.to_string())
    }
}

impl From<csv::Error> for RagError {
    fn from(err: csv::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}
