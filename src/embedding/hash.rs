//! Deterministic feature-hashing embedder
//!
//! Each lowercase word token is hashed with BLAKE3 into a signed bucket and the
//! resulting vector is L2-normalized. Needs no model download and gives
//! identical output on every machine; similarity is lexical only.

use super::{EmbeddingError, EmbeddingProvider};
use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid token regex"));

pub struct HashEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_name: format!("hash-{}", dimension),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = blake3::hash(token.as_bytes());
        let bytes = digest.as_bytes();
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&bytes[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let lower = trimmed.to_lowercase();
        let mut vector = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;

        for token in TOKEN.find_iter(&lower) {
            let (index, sign) = self.bucket(token.as_str());
            vector[index] += sign;
            tokens += 1;
        }

        // Punctuation-only text still gets a stable, non-zero vector
        if tokens == 0 {
            let (index, sign) = self.bucket(&lower);
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        } else {
            // Signed collisions cancelled out exactly
            vector[0] = 1.0;
        }

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
