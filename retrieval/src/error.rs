//! Error types for the retrieval engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
///
/// Search itself never returns these; they come from construction,
/// ingestion, and the store/extractor collaborators.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] docsearch_embeddings::EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Text could not be extracted from a file.
    #[error("extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// Document store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}
