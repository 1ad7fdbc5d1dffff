//! Explainable semantic search over a fixed corpus of text documents.
//!
//! Documents are embedded once, cached by content fingerprint, and searched
//! with an exact inner-product index. Every hit carries a lexical
//! explanation next to its semantic score.

pub mod cache;
pub mod config;
pub mod corpus;
pub mod display;
pub mod error;
pub mod fingerprint;
#[cfg(feature = "http-server")]
pub mod http;
pub mod io;
pub mod search;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use cache::{CacheError, CacheRecord, EmbeddingCache, SqliteEmbeddingCache};
pub use config::Settings;
pub use corpus::load_corpus;
pub use error::{EngineResult, SearchError};
pub use fingerprint::compute_fingerprint;
pub use search::{
    BuildReport, EngineState, Explanation, SearchEngine, SearchOptions, SearchResult,
};
pub use types::{DocumentId, Embedding, Fingerprint};
pub use vector::{EmbeddingGenerator, EmbeddingRun, FlatIndex, HashingEncoder, TextEncoder};
