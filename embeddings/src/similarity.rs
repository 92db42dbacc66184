//! Similarity computation for embeddings.

use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors, or either vector is all zeros
/// - -1.0 means opposite vectors
///
/// Vectors of different lengths are never compared; that case is reported as
/// [`EmbeddingError::DimensionMismatch`] with `a` as the expected side.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    // Accumulate in f64: squares of finite f32 values neither underflow nor overflow there.
    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let magnitude_a = magnitude_f64(a);
    let magnitude_b = magnitude_f64(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    // Rounding can push |v|·|v| a hair past 1.
    Ok((dot_product / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0) as f32)
}

/// Euclidean (L2) length of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    magnitude_f64(v) as f32
}

fn magnitude_f64(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

/// Normalize an embedding to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(embedding: &mut [f32]) {
    let magnitude = magnitude_f64(embedding);
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x = (f64::from(*x) / magnitude) as f32;
        }
    }
}
