//! Durable embedding cache keyed by document id and validated by fingerprint.
//!
//! A record is only served back when the caller's current fingerprint equals
//! the stored one. Stale records are never deleted proactively; they simply
//! stop matching once the document text changes. [`EmbeddingCache::clear`]
//! is the only bulk removal.

mod sqlite;

pub use sqlite::SqliteEmbeddingCache;

use std::collections::HashMap;
use thiserror::Error;

use crate::types::{DocumentId, Embedding, Fingerprint};

/// One stored cache row.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub doc_id: DocumentId,
    pub embedding: Embedding,
    pub fingerprint: Fingerprint,
    /// RFC 3339 timestamp of the last write
    pub updated_at: String,
}

/// Errors raised by cache storage.
///
/// Any of these means the store could not answer reliably. Callers must not
/// treat them as a cache miss without logging.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache record for '{doc_id}': {reason}")]
    Corrupt { doc_id: String, reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Write-through store mapping document ids to embeddings.
///
/// Every call is an independent durable read or write. Implementations must
/// be safe to share across threads; concurrent `put`s to the same id resolve
/// as last-write-wins.
pub trait EmbeddingCache: Send + Sync {
    /// Returns the stored embedding only if a record exists for `doc_id`
    /// and its fingerprint equals `fingerprint`.
    fn get(&self, doc_id: &DocumentId, fingerprint: &Fingerprint) -> CacheResult<Option<Embedding>>;

    /// Inserts or replaces the record for `doc_id`, stamped with the current time.
    fn put(
        &self,
        doc_id: &DocumentId,
        embedding: &[f32],
        fingerprint: &Fingerprint,
    ) -> CacheResult<()>;

    /// Snapshot of every stored embedding, regardless of fingerprint validity.
    fn all(&self) -> CacheResult<HashMap<DocumentId, Embedding>>;

    /// Full records, ordered by document id. Diagnostics only.
    fn records(&self) -> CacheResult<Vec<CacheRecord>>;

    /// Number of stored records.
    fn len(&self) -> CacheResult<usize>;

    fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes every record.
    fn clear(&self) -> CacheResult<()>;
}

/// Little-endian f32 encoding of an embedding.
pub(crate) fn encode_embedding_blob(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes a blob written by [`encode_embedding_blob`].
pub(crate) fn decode_embedding_blob(doc_id: &str, blob: &[u8]) -> CacheResult<Embedding> {
    if blob.len() % std::mem::size_of::<f32>() != 0 {
        return Err(CacheError::Corrupt {
            doc_id: doc_id.to_string(),
            reason: format!("embedding blob length {} is not a multiple of 4", blob.len()),
        });
    }

    let mut out = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !value.is_finite() {
            return Err(CacheError::Corrupt {
                doc_id: doc_id.to_string(),
                reason: "embedding contains non-finite values".to_string(),
            });
        }
        out.push(value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_round_trip() {
        let vector = vec![0.25, -1.5, 3.0e-7, 0.0];
        let blob = encode_embedding_blob(&vector);
        assert_eq!(blob.len(), 16);
        assert_eq!(&blob[..4], &0.25f32.to_le_bytes());
        assert_eq!(decode_embedding_blob("a", &blob).unwrap(), vector);
    }

    #[test]
    fn test_decode_rejects_truncated_blob() {
        let err = decode_embedding_blob("a", &[0, 0, 128]).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[test]
    fn test_decode_rejects_non_finite_values() {
        let blob = encode_embedding_blob(&[1.0, f32::NAN]);
        assert!(matches!(
            decode_embedding_blob("a", &blob),
            Err(CacheError::Corrupt { .. })
        ));
    }
}
