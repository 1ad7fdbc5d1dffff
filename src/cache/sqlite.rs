//! SQLite-backed embedding cache.
//!
//! Schema: a single `embeddings` table keyed by `doc_id`, holding the vector
//! as a little-endian f32 blob, the hex fingerprint of the text it was
//! computed from, and an RFC 3339 `updated_at` timestamp.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{
    CacheError, CacheRecord, CacheResult, EmbeddingCache, decode_embedding_blob,
    encode_embedding_blob,
};
use crate::types::{DocumentId, Embedding, Fingerprint};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS embeddings (
    doc_id TEXT PRIMARY KEY,
    embedding BLOB NOT NULL,
    hash TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Embedding cache persisted in a SQLite database file.
///
/// A single connection is shared behind a mutex; every statement runs in
/// autocommit mode, so each `get`/`put` is independently durable.
pub struct SqliteEmbeddingCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteEmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEmbeddingCache")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteEmbeddingCache {
    /// Open or create the cache at the provided path.
    ///
    /// Parent directories are created as needed.
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets readers proceed while the single writer commits
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Opened embedding cache at {} (journal_mode={mode})", path.display());
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create a cache that lives only as long as this value.
    pub fn in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Location of the database file, `None` for in-memory caches.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl EmbeddingCache for SqliteEmbeddingCache {
    fn get(
        &self,
        doc_id: &DocumentId,
        fingerprint: &Fingerprint,
    ) -> CacheResult<Option<Embedding>> {
        let conn = self.conn.lock();
        let row: Option<(Vec<u8>, String)> = conn
            .query_row(
                "SELECT embedding, hash FROM embeddings WHERE doc_id = ?1",
                params![doc_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        match row {
            Some((blob, hash)) if hash == fingerprint.as_str() => {
                decode_embedding_blob(doc_id.as_str(), &blob).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn put(
        &self,
        doc_id: &DocumentId,
        embedding: &[f32],
        fingerprint: &Fingerprint,
    ) -> CacheResult<()> {
        let blob = encode_embedding_blob(embedding);
        let timestamp = Utc::now().to_rfc3339();
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO embeddings (doc_id, embedding, hash, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![doc_id.as_str(), blob, fingerprint.as_str(), timestamp],
        )?;
        Ok(())
    }

    fn all(&self) -> CacheResult<HashMap<DocumentId, Embedding>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT doc_id, embedding FROM embeddings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut results = HashMap::new();
        for row in rows {
            let (doc_id, blob) = row?;
            let embedding = decode_embedding_blob(&doc_id, &blob)?;
            results.insert(DocumentId::from(doc_id), embedding);
        }
        Ok(results)
    }

    fn records(&self) -> CacheResult<Vec<CacheRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT doc_id, embedding, hash, updated_at FROM embeddings ORDER BY doc_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (doc_id, blob, hash, updated_at) = row?;
            let embedding = decode_embedding_blob(&doc_id, &blob)?;
            let fingerprint = Fingerprint::from_hex(hash).ok_or_else(|| CacheError::Corrupt {
                doc_id: doc_id.clone(),
                reason: "stored fingerprint is not a 64-character hex digest".to_string(),
            })?;
            records.push(CacheRecord {
                doc_id: DocumentId::from(doc_id),
                embedding,
                fingerprint,
                updated_at,
            });
        }
        Ok(records)
    }

    fn len(&self) -> CacheResult<usize> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn clear(&self) -> CacheResult<()> {
        self.conn.lock().execute("DELETE FROM embeddings", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::compute_fingerprint;
    use tempfile::TempDir;

    #[test]
    fn test_put_then_get_round_trip() {
        let cache = SqliteEmbeddingCache::in_memory().unwrap();
        let id = DocumentId::from("a");
        let fingerprint = compute_fingerprint("the cat sat on the mat");
        let vector = vec![0.6, 0.8, 0.0];

        cache.put(&id, &vector, &fingerprint).unwrap();
        assert_eq!(cache.get(&id, &fingerprint).unwrap(), Some(vector));
    }

    #[test]
    fn test_get_with_other_fingerprint_is_absent() {
        let cache = SqliteEmbeddingCache::in_memory().unwrap();
        let id = DocumentId::from("a");
        cache
            .put(&id, &[1.0, 0.0], &compute_fingerprint("old text"))
            .unwrap();

        assert_eq!(cache.get(&id, &compute_fingerprint("new text")).unwrap(), None);
        assert_eq!(
            cache
                .get(&DocumentId::from("missing"), &compute_fingerprint("old text"))
                .unwrap(),
            None
        );
        // the stale record is kept, not deleted
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_put_replaces_previous_record() {
        let cache = SqliteEmbeddingCache::in_memory().unwrap();
        let id = DocumentId::from("a");
        let first = compute_fingerprint("v1");
        let second = compute_fingerprint("v2");

        cache.put(&id, &[1.0, 0.0], &first).unwrap();
        cache.put(&id, &[0.0, 1.0], &second).unwrap();

        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.get(&id, &first).unwrap(), None);
        assert_eq!(cache.get(&id, &second).unwrap(), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_all_records_and_clear() {
        let cache = SqliteEmbeddingCache::in_memory().unwrap();
        cache
            .put(&DocumentId::from("b"), &[0.0, 1.0], &compute_fingerprint("b"))
            .unwrap();
        cache
            .put(&DocumentId::from("a"), &[1.0, 0.0], &compute_fingerprint("a"))
            .unwrap();

        let all = cache.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&DocumentId::from("a")], vec![1.0, 0.0]);

        let records = cache.records().unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(records[0].fingerprint, compute_fingerprint("a"));
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].updated_at).is_ok());

        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
        assert!(cache.all().unwrap().is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("embeddings.db");
        let id = DocumentId::from("doc");
        let fingerprint = compute_fingerprint("persistent");

        {
            let cache = SqliteEmbeddingCache::open(&path).unwrap();
            cache.put(&id, &[0.5, -0.5], &fingerprint).unwrap();
        }

        let reopened = SqliteEmbeddingCache::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.get(&id, &fingerprint).unwrap(), Some(vec![0.5, -0.5]));
    }

    #[test]
    fn test_corrupt_blob_is_an_error_not_a_miss() {
        let cache = SqliteEmbeddingCache::in_memory().unwrap();
        let fingerprint = compute_fingerprint("x");
        cache
            .conn
            .lock()
            .execute(
                "INSERT INTO embeddings (doc_id, embedding, hash, updated_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params!["bad", vec![1u8, 2, 3], fingerprint.as_str(), "2024-01-01T00:00:00Z"],
            )
            .unwrap();

        let result = cache.get(&DocumentId::from("bad"), &fingerprint);
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }
}
