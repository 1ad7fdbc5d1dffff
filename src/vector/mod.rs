//! Embedding generation and exact vector search.
//!
//! The pieces, leaves first:
//! - [`TextEncoder`]: the pluggable text-to-vector capability
//! - [`EmbeddingGenerator`]: normalization, cache checks and batching
//! - [`FlatIndex`]: brute-force inner-product search over unit vectors
//!
//! # Architecture
//! Vectors are normalized once when produced, so the index scores with a
//! plain dot product and never recomputes norms at query time.

mod encoder;
mod generator;
mod index;
pub mod similarity;
mod types;

#[cfg(feature = "fastembed")]
pub use encoder::FastEmbedEncoder;
pub use encoder::{HashingEncoder, TextEncoder};
pub use generator::{DEFAULT_BATCH_SIZE, EmbeddingGenerator, EmbeddingRun};
pub use index::FlatIndex;
pub use types::{VECTOR_DIMENSION_384, VectorDimension, VectorError};
