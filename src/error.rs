//! Error types for the search core
//!
//! This module provides the engine-level error taxonomy using thiserror.
//! Lower layers keep their own error enums (`VectorError`, `CacheError`)
//! and convert into [`SearchError`] at the engine boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;
use crate::vector::VectorError;

/// Main error type for indexing and search operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// Build requested over a corpus with zero documents
    #[error("Corpus contains no documents; the index was left unchanged")]
    EmptyCorpus,

    /// Search or lookup before any successful build
    #[error("Index not built. Call build_index() first")]
    IndexNotBuilt,

    /// Heterogeneous vectors at build time, or a query of the wrong size
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The encoder capability failed; never swallowed
    #[error("Encoder failed: {0}")]
    EncoderFailure(String),

    /// Cache storage could not be read or written
    #[error("Embedding cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Corpus directory does not exist
    #[error("Corpus directory '{path}' not found")]
    CorpusNotFound { path: PathBuf },

    /// File system errors while reading the corpus
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Other vector index construction errors
    #[error(transparent)]
    Vector(VectorError),
}

impl SearchError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::EmptyCorpus => "EMPTY_CORPUS",
            Self::IndexNotBuilt => "INDEX_NOT_BUILT",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::EncoderFailure(_) => "ENCODER_FAILURE",
            Self::CacheUnavailable(_) => "CACHE_UNAVAILABLE",
            Self::CorpusNotFound { .. } => "CORPUS_NOT_FOUND",
            Self::Io { .. } => "IO_ERROR",
            Self::Vector(_) => "VECTOR_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::EmptyCorpus | Self::CorpusNotFound { .. } => vec![
                "Check that the docs directory contains *.txt files",
                "Set docs_dir in .docsense/settings.toml or pass a directory on the command line",
            ],
            Self::IndexNotBuilt => vec!["Run 'docsense index' or build the index before searching"],
            Self::DimensionMismatch { .. } => vec![
                "Ensure all vectors come from the same embedding model",
                "Run 'docsense cache clear' after switching models",
            ],
            Self::EncoderFailure(_) => vec![
                "Verify the embedding model is installed and loads correctly",
                "Retry the operation; no partial results were kept",
            ],
            Self::CacheUnavailable(_) => vec![
                "Check permissions and disk space for the cache path",
                "Delete the cache file to rebuild it from scratch",
            ],
            Self::Io { .. } => vec!["Check that the file exists, is readable, and is valid UTF-8"],
            Self::Vector(_) => vec![],
        }
    }
}

impl From<VectorError> for SearchError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            VectorError::EmbeddingFailed(reason) => Self::EncoderFailure(reason),
            VectorError::EmptyIndex => Self::EmptyCorpus,
            other => Self::Vector(other),
        }
    }
}

impl From<CacheError> for SearchError {
    fn from(err: CacheError) -> Self {
        Self::CacheUnavailable(err.to_string())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, SearchError>;
