//! Local embedding backend
//!
//! Hashes words and word pairs into a fixed-size vector. Needs no API key,
//! so it serves local runs and tests. FNV-1a keeps the hashing identical
//! across builds, which matters because vectors are persisted with each
//! memory.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::Result;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Weight of a bigram relative to a unigram
const BIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder over unigrams and bigrams
pub struct TfIdfEmbedder {
    dimensions: usize,
}

impl TfIdfEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        bytes.iter().fold(FNV_OFFSET, |hash, b| {
            (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
        })
    }

    /// Slot and sign of a feature. The top hash bit picks the sign so
    /// colliding features tend to cancel instead of pile up.
    fn slot(&self, feature: &str) -> (usize, f32) {
        let hash = Self::fnv1a(feature.as_bytes());
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        ((hash % self.dimensions as u64) as usize, sign)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .collect();

        let mut vector = vec![0.0_f32; self.dimensions];
        if words.is_empty() {
            return vector;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &word in &words {
            *counts.entry(word).or_default() += 1;
        }

        // log-scaled term frequency, longer words treated as rarer
        let total = words.len() as f32;
        for (word, count) in counts {
            let weight = (1.0 + count as f32 / total).ln() * (1.0 + 0.1 * word.len() as f32);
            let (idx, sign) = self.slot(word);
            vector[idx] += sign * weight;
        }
        for pair in words.windows(2) {
            let (idx, sign) = self.slot(&format!("{} {}", pair[0], pair[1]));
            vector[idx] += sign * BIGRAM_WEIGHT;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for TfIdfEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "tfidf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_tfidf_deterministic() {
        let embedder = TfIdfEmbedder::new(384);

        let e1 = embedder.embed("hello world").await.unwrap();
        let e2 = embedder.embed("hello world").await.unwrap();
        assert_eq!(e1, e2);
    }

    #[test]
    fn test_fnv_known_value() {
        // FNV-1a 64 of "a"
        assert_eq!(TfIdfEmbedder::fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[tokio::test]
    async fn test_tfidf_similarity() {
        let embedder = TfIdfEmbedder::new(384);

        let e1 = embedder
            .embed("the quick brown fox jumps over the lazy dog")
            .await
            .unwrap();
        let e2 = embedder
            .embed("a fast brown fox leaps over a sleepy dog")
            .await
            .unwrap();
        let e3 = embedder
            .embed("quantum physics and thermodynamics")
            .await
            .unwrap();

        assert!(
            cosine_similarity(&e1, &e2) > cosine_similarity(&e1, &e3),
            "Similar sentences should have higher similarity"
        );
    }

    #[tokio::test]
    async fn test_tfidf_empty() {
        let embedder = TfIdfEmbedder::new(384);
        let e = embedder.embed("").await.unwrap();
        assert_eq!(e.len(), 384);
        assert!(e.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_tfidf_normalized() {
        let embedder = TfIdfEmbedder::new(384);
        let e = embedder
            .embed("this is a test sentence with multiple words")
            .await
            .unwrap();

        let norm: f32 = e.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001, "Embedding should be L2 normalized");
    }
}
