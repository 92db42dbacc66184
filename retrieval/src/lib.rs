//! # Retrieval Engine
//!
//! Ranks documents by semantic relevance to a free-text query and keeps
//! working when the embedding provider does not:
//!
//! - **Vector ranking**: cosine similarity against cached document embeddings
//! - **Fallback embedding**: a deterministic local embedder replaces the
//!   provider on failure or timeout
//! - **Substring degradation**: when no document has a usable embedding,
//!   documents containing the query text are returned instead
//! - **Ingestion**: bounded-concurrency embedding of stored documents
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SemanticSearch                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  query ──► normalize ──► provider ─(fail/timeout)─► fallback    │
//! │                              │                        │         │
//! │                              └──────────┬─────────────┘         │
//! │                                         ▼                       │
//! │        DocumentStore ──► cosine ranking / substring match       │
//! │                                         │                       │
//! │                                         ▼                       │
//! │                          sorted, capped SearchResults           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsearch_retrieval::{Document, SemanticSearch};
//!
//! let engine = SemanticSearch::builder().build()?;
//! let docs = vec![Document::new("a", "Invoice", "Q4 Invoice #123")];
//! let results = engine.search("invoice", &docs, 5).await;
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod store;

pub use config::{EmbeddingConfig, EmbeddingProviderType, IngestConfig, RetrievalConfig, SearchConfig};
pub use document::{Document, SearchResult, content_fingerprint};
pub use engine::{
    EmbeddedText, SearchMode, SearchOutcome, SemanticSearch, SemanticSearchBuilder, VectorSource,
};
pub use error::{Result, RetrievalError};
pub use extract::{PlainTextExtractor, TextExtractor};
pub use ingest::{IngestReport, Ingestor};
pub use store::{DocumentStore, InMemoryDocumentStore};

// Re-export from dependencies for convenience
pub use docsearch_embeddings::{EMBEDDING_DIMENSION, EmbeddingProvider, FallbackEmbedder};
