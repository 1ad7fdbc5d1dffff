//! Text encoders: the external capability that turns text into vectors.
//!
//! The search core only depends on the [`TextEncoder`] trait. Two
//! implementations ship with the crate:
//!
//! - [`HashingEncoder`]: deterministic feature hashing over lowercase tokens.
//!   Needs no model download and is what the CLI uses unless configured
//!   otherwise.
//! - `FastEmbedEncoder` (feature `fastembed`): all-MiniLM-L6-v2 sentence
//!   embeddings through fastembed.
//!
//! Encoders return raw vectors. Normalization is the caller's job
//! (see [`crate::vector::EmbeddingGenerator`]).

use crate::vector::{VectorDimension, VectorError};
use sha2::{Digest, Sha256};

/// Trait for turning text into fixed-dimension float vectors.
///
/// Implementations must be stateless from the caller's point of view and
/// deterministic for identical input. They should be thread-safe and
/// cheaper per item when called with a batch.
pub trait TextEncoder: Send + Sync {
    /// Encode multiple texts in one call.
    ///
    /// # Returns
    /// One vector per input text, in input order, or an error that fails
    /// the whole batch.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError>;

    /// Encode a single text.
    fn encode(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        self.encode_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| VectorError::EmbeddingFailed("encoder returned no vector".to_string()))
    }

    /// Get the dimension of vectors produced by this encoder.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Human readable model identifier, used in logs and diagnostics.
    fn model_name(&self) -> &str;
}

/// Deterministic feature-hashing encoder.
///
/// Each lowercase whitespace token is hashed with SHA-256; the digest picks a
/// bucket and a sign, and the bucket accumulates +1 or -1. Texts that share
/// tokens get positive similarity, unrelated texts land near zero. Text with
/// no tokens encodes to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dimension: VectorDimension,
}

impl HashingEncoder {
    pub fn new(dimension: VectorDimension) -> Self {
        Self { dimension }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let dim = self.dimension.get();
        let mut vector = vec![0.0; dim];
        for token in text.split_whitespace() {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bits = u64::from_le_bytes(head);
            let bucket = (bits % dim as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        vector
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(VectorDimension::dimension_384())
    }
}

impl TextEncoder for HashingEncoder {
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

#[cfg(feature = "fastembed")]
pub use self::fastembed_backend::FastEmbedEncoder;

#[cfg(feature = "fastembed")]
mod fastembed_backend {
    use super::TextEncoder;
    use crate::vector::{VECTOR_DIMENSION_384, VectorDimension, VectorError};
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// FastEmbed implementation using the AllMiniLML6V2 model.
    ///
    /// Produces 384-dimensional sentence embeddings. The model is downloaded
    /// into `cache_dir` on first use.
    pub struct FastEmbedEncoder {
        model: Mutex<TextEmbedding>,
        dimension: VectorDimension,
    }

    impl FastEmbedEncoder {
        /// Create a new FastEmbed encoder.
        ///
        /// # Errors
        /// Returns an error if the model fails to initialize or download.
        pub fn new(cache_dir: PathBuf, show_progress: bool) -> Result<Self, VectorError> {
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                    .with_cache_dir(cache_dir)
                    .with_show_download_progress(show_progress),
            )
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!(
                    "Failed to initialize embedding model: {e}. \
                     Ensure you have internet connection for first-time model download"
                ))
            })?;

            Ok(Self {
                model: Mutex::new(model),
                dimension: VectorDimension::dimension_384(),
            })
        }
    }

    impl TextEncoder for FastEmbedEncoder {
        fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

            let embeddings = self
                .model
                .lock()
                .map_err(|_| {
                    VectorError::EmbeddingFailed(
                        "Failed to acquire embedding model lock - model may be poisoned"
                            .to_string(),
                    )
                })?
                .embed(text_strings, None)
                .map_err(|e| {
                    VectorError::EmbeddingFailed(format!("Failed to generate embeddings: {e}"))
                })?;

            if let Some(bad) = embeddings.iter().find(|e| e.len() != VECTOR_DIMENSION_384) {
                return Err(VectorError::EmbeddingFailed(format!(
                    "model returned a {}-dimensional vector, expected {VECTOR_DIMENSION_384}",
                    bad.len()
                )));
            }

            Ok(embeddings)
        }

        fn dimension(&self) -> VectorDimension {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "AllMiniLML6V2"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::similarity::{dot, l2_norm, normalize_in_place};

    fn encoder() -> HashingEncoder {
        HashingEncoder::new(VectorDimension::new(256).unwrap())
    }

    #[test]
    fn test_hashing_encoder_is_deterministic() {
        let encoder = encoder();
        let first = encoder.encode("stock market rises today").unwrap();
        let second = encoder.encode("stock market rises today").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 256);
    }

    #[test]
    fn test_hashing_encoder_batch_matches_single() {
        let encoder = encoder();
        let batch = encoder.encode_batch(&["alpha beta", "gamma"]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], encoder.encode("alpha beta").unwrap());
        assert_eq!(batch[1], encoder.encode("gamma").unwrap());
    }

    #[test]
    fn test_hashing_encoder_is_case_insensitive() {
        let encoder = encoder();
        assert_eq!(
            encoder.encode("Cat PETS").unwrap(),
            encoder.encode("cat pets").unwrap()
        );
    }

    #[test]
    fn test_hashing_encoder_identical_text_is_maximally_similar() {
        let encoder = encoder();
        let mut a = encoder.encode("cats and dogs are pets").unwrap();
        let mut b = encoder.encode("cats and dogs are pets").unwrap();
        assert!(normalize_in_place(&mut a));
        assert!(normalize_in_place(&mut b));
        assert!((dot(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_encoder_blank_text_is_zero_vector() {
        let encoder = encoder();
        let v = encoder.encode("   ").unwrap();
        assert_eq!(l2_norm(&v), 0.0);
    }
}
