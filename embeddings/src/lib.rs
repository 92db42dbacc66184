//! # Embeddings
//!
//! Turns free-form text into fixed-length vectors and compares them.
//!
//! ## Features
//!
//! - **Normalization**: whitespace collapsing and length bounding before embedding
//! - **Providers**: a remote OpenAI-compatible provider behind the [`EmbeddingProvider`] trait
//! - **Fallback**: a deterministic feature-hashing embedder that needs no network
//! - **Similarity**: zero-safe cosine similarity
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  normalize_text ──► EmbeddingProvider ──► Embedding             │
//! │                          │ (unavailable)      │                 │
//! │                          ▼                    ▼                 │
//! │                   FallbackEmbedder     cosine_similarity        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fallback;
pub mod normalize;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use fallback::FallbackEmbedder;
pub use normalize::{MAX_INPUT_CHARS, normalize_text, normalize_text_with_limit};
pub use provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, OpenAIProvider};
pub use similarity::{cosine_similarity, l2_normalize};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension shared by provider and fallback vectors.
pub const EMBEDDING_DIMENSION: usize = 1536; // OpenAI text-embedding-3-small
