//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured (missing API key).
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The provider did not answer in time.
    #[error("provider timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedder configured with unusable parameters.
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),

    /// Nothing to embed after normalization.
    #[error("no embeddable content")]
    EmptyInput,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether this error means the remote provider could not serve the
    /// request (auth, quota, network, timeout or a malformed answer).
    ///
    /// Callers recover from these by switching to the fallback embedder.
    pub fn is_provider_unavailable(&self) -> bool {
        match self {
            EmbeddingError::ProviderNotConfigured
            | EmbeddingError::ApiRequest(_)
            | EmbeddingError::InvalidResponse(_)
            | EmbeddingError::RateLimited { .. }
            | EmbeddingError::Timeout { .. }
            | EmbeddingError::Http(_) => true,
            // A provider answering with the wrong width is unusable for this corpus.
            EmbeddingError::DimensionMismatch { .. } => true,
            EmbeddingError::InvalidConfig(_)
            | EmbeddingError::EmptyInput
            | EmbeddingError::Serialization(_) => false,
        }
    }
}
