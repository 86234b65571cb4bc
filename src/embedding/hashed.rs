//! Deterministic hash-based embeddings.
//!
//! Used when no remote embedding backend is configured. Output is
//! bit-reproducible so tests and re-ingestion behave identically across runs.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Deterministic fallback embedder.
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    /// Create a fallback embedder with the given output dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Embed a single text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        hashed_embedding(text, self.dimensions)
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Compute a deterministic embedding for text.
///
/// Word-position hashes fill the vector, the first three slots are overwritten
/// with global text features, and the result is L2-normalized. An empty input
/// stays the zero vector rather than dividing by zero.
pub fn hashed_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimensions];
    if dimensions == 0 {
        return vector;
    }

    let lowered = text.to_lowercase();
    for (i, word) in lowered.split_whitespace().take(dimensions).enumerate() {
        let digest = Sha256::digest(format!("{}_{}", word, i).as_bytes());
        let hash_val = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        vector[i % dimensions] = (hash_val % 10_000) as f32 / 10_000.0;
    }

    // Global features: normalized length, distinct-character count, space count.
    let distinct_chars: HashSet<char> = lowered.chars().collect();
    let features = [
        text.len() as f32 / 1000.0,
        distinct_chars.len() as f32 / 100.0,
        text.matches(' ').count() as f32 / 100.0,
    ];
    for (i, feature) in features.iter().enumerate() {
        if i < dimensions {
            vector[i] = *feature;
        }
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }

    vector
}

#[async_trait]
impl Embedder for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = hashed_embedding("spindle bearing replacement", 1024);
        let b = hashed_embedding("spindle bearing replacement", 1024);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unit_norm() {
        let v = hashed_embedding("check the coolant filter weekly", 1024);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_zero_vector() {
        let v = hashed_embedding("", 1024);
        assert_eq!(v.len(), 1024);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_different_texts_differ() {
        let a = hashed_embedding("tool wear limits", 1024);
        let b = hashed_embedding("feed rate table", 1024);
        assert_ne!(a, b);
    }

    #[test]
    fn test_dimensions_respected() {
        assert_eq!(hashed_embedding("anything", 256).len(), 256);
        let embedder = HashedEmbedder::new(512);
        assert_eq!(embedder.dimensions(), 512);
        assert_eq!(embedder.embed_text("anything").len(), 512);
    }
}
