//! Deterministic feature-hashing embedder.
//!
//! Used whenever the remote provider cannot answer. Every distinct token is
//! hashed with 64-bit FNV-1a into one of `dimension` buckets, the bucket
//! accumulates the token's frequency, and the result is L2-normalized.
//! Documents sharing vocabulary end up close to each other, which is far
//! weaker than a real model but keeps ranking alive and reproducible.
//!
//! The hash is part of the on-disk contract: vectors cached by earlier runs
//! must stay comparable, so neither the hash nor the token rules may change.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{EmbeddingError, Result};
use crate::normalize::{MAX_INPUT_CHARS, normalize_text_with_limit};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::similarity::l2_normalize;
use crate::{EMBEDDING_DIMENSION, Embedding};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Model label reported for fallback vectors.
pub const FALLBACK_MODEL: &str = "fnv1a-bucket";

/// 64-bit FNV-1a over the UTF-8 bytes of `token`.
pub fn fnv1a_64(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Pure, dependency-free embedder producing `dimension`-length vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackEmbedder {
    dimension: usize,
    max_input_chars: usize,
}

impl FallbackEmbedder {
    /// Create an embedder producing vectors of the given dimension.
    ///
    /// A zero dimension is a configuration error and is rejected here rather
    /// than at embedding time.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            max_input_chars: MAX_INPUT_CHARS,
        })
    }

    /// Bound the amount of text considered per call.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Output dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `text`. Returns the all-zero vector when `text` has no tokens.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let normalized = normalize_text_with_limit(text, self.max_input_chars);

        let mut frequencies: BTreeMap<String, u32> = BTreeMap::new();
        for token in normalized.split_whitespace() {
            *frequencies.entry(token.to_lowercase()).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimension];
        let buckets = self.dimension as u64;
        for (token, count) in &frequencies {
            let bucket = (fnv1a_64(token) % buckets) as usize;
            vector[bucket] += *count as f32;
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Default for FallbackEmbedder {
    fn default() -> Self {
        Self {
            dimension: EMBEDDING_DIMENSION,
            max_input_chars: MAX_INPUT_CHARS,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FallbackEmbedder {
    fn name(&self) -> &str {
        "fallback"
    }

    fn default_model(&self) -> &str {
        FALLBACK_MODEL
    }

    fn default_dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let embedding = self.embed_text(&request.text);
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: FALLBACK_MODEL.to_string(),
            tokens_used: None,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{cosine_similarity, magnitude};
    use pretty_assertions::assert_eq;

    #[test]
    fn fnv1a_reference_values() {
        assert_eq!(fnv1a_64(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64("foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn same_text_same_vector() {
        let embedder = FallbackEmbedder::default();
        let a = embedder.embed_text("quarterly invoice for acme");
        let b = embedder.embed_text("quarterly invoice for acme");
        assert_eq!(a, b);
    }

    #[test]
    fn vector_has_configured_dimension_and_unit_norm() {
        let embedder = FallbackEmbedder::default();
        let v = embedder.embed_text("Team lunch notes");
        assert_eq!(v.len(), EMBEDDING_DIMENSION);
        assert!((magnitude(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = FallbackEmbedder::new(64).unwrap();
        for text in ["", "   ", "\n\t"] {
            let v = embedder.embed_text(text);
            assert_eq!(v.len(), 64);
            assert!(v.iter().all(|x| *x == 0.0));
        }
    }

    #[test]
    fn whitespace_and_case_do_not_change_vector() {
        let embedder = FallbackEmbedder::default();
        assert_eq!(
            embedder.embed_text("Invoice  #123"),
            embedder.embed_text("  invoice #123\n")
        );
    }

    #[test]
    fn frequencies_accumulate_in_one_bucket() {
        let embedder = FallbackEmbedder::new(8).unwrap();
        let v = embedder.embed_text("spam spam spam");
        let nonzero: Vec<f32> = v.iter().copied().filter(|x| *x != 0.0).collect();
        assert_eq!(nonzero, vec![1.0]);
        assert_eq!(v[(fnv1a_64("spam") % 8) as usize], 1.0);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = FallbackEmbedder::default();
        let query = embedder.embed_text("invoice payment");
        let related = embedder.embed_text("invoice payment due friday");
        let unrelated = embedder.embed_text("team lunch notes");
        let related_score = cosine_similarity(&query, &related).unwrap();
        let unrelated_score = cosine_similarity(&query, &unrelated).unwrap();
        assert!(related_score > unrelated_score);
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(FallbackEmbedder::new(0).is_err());
    }

    #[tokio::test]
    async fn provider_impl_matches_direct_call() {
        let embedder = FallbackEmbedder::new(32).unwrap();
        let response = embedder
            .embed(EmbeddingRequest::new("hello world"))
            .await
            .unwrap();
        assert_eq!(response.dimension, 32);
        assert_eq!(response.model, FALLBACK_MODEL);
        assert_eq!(response.embedding, embedder.embed_text("hello world"));
        assert!(embedder.is_available());
    }
}
