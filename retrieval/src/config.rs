//! Configuration for the retrieval engine.

use std::path::Path;
use std::time::Duration;

use docsearch_embeddings::{EMBEDDING_DIMENSION, MAX_INPUT_CHARS};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Query processing configuration.
    pub search: SearchConfig,

    /// Bulk embedding configuration.
    pub ingest: IngestConfig,
}

impl RetrievalConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&content)
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the search configuration.
    pub fn with_search(mut self, config: SearchConfig) -> Self {
        self.search = config;
        self
    }

    /// Set the ingestion configuration.
    pub fn with_ingest(mut self, config: IngestConfig) -> Self {
        self.ingest = config;
        self
    }

    /// Reject values that would make the engine misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(RetrievalError::Config(
                "embedding.dimension must be greater than zero".to_string(),
            ));
        }
        if self.embedding.max_input_chars == 0 {
            return Err(RetrievalError::Config(
                "embedding.max_input_chars must be greater than zero".to_string(),
            ));
        }
        if self.ingest.concurrency == 0 {
            return Err(RetrievalError::Config(
                "ingest.concurrency must be greater than zero".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.search.substring_score) {
            return Err(RetrievalError::Config(format!(
                "search.substring_score must be within [-1, 1], got {}",
                self.search.substring_score
            )));
        }
        Ok(())
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// Override for the provider endpoint.
    pub base_url: Option<String>,

    /// Width of every vector in the corpus.
    pub dimension: usize,

    /// Longest normalized text handed to an embedder.
    pub max_input_chars: usize,

    /// How long to wait on the provider before falling back (milliseconds).
    pub provider_timeout_ms: u64,
}

impl EmbeddingConfig {
    /// Provider timeout as a [`Duration`].
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAI,
            model: None,
            base_url: None,
            dimension: EMBEDDING_DIMENSION,
            max_input_chars: MAX_INPUT_CHARS,
            provider_timeout_ms: 10_000,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI embeddings API.
    OpenAI,
    /// Offline feature-hashing embedder only.
    Fallback,
}

/// Configuration for query processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results when the caller does not pass a limit.
    pub default_limit: usize,

    /// Score assigned to substring matches when no vectors are usable.
    pub substring_score: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            substring_score: 0.5,
        }
    }
}

/// Configuration for bulk embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum provider calls in flight at once.
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}
