#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use docsense::cache::{CacheError, CacheResult};
use docsense::vector::{VectorDimension, VectorError};
use docsense::{CacheRecord, DocumentId, Embedding, EmbeddingCache, Fingerprint, TextEncoder};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Directory of `*.txt` documents that disappears with the value.
pub struct TestCorpus {
    pub dir: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn add_document(&self, id: &str, text: &str) -> PathBuf {
        let file_path = self.dir.path().join(format!("{id}.txt"));
        fs::write(&file_path, text).expect("Failed to write document");
        file_path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn corpus(docs: &[(&str, &str)]) -> BTreeMap<DocumentId, String> {
    docs.iter()
        .map(|(id, text)| (DocumentId::from(*id), text.to_string()))
        .collect()
}

/// The three-document corpus used by the ranking scenarios.
pub fn pets_corpus() -> BTreeMap<DocumentId, String> {
    corpus(&[
        ("a", "the cat sat on the mat"),
        ("b", "stock market rises today"),
        ("c", "cats and dogs are pets"),
    ])
}

/// Exact bag-of-words encoder: every vocabulary word owns one axis.
///
/// Unlike feature hashing there are no collisions, so similarities are
/// exactly predictable. Words outside the vocabulary are ignored.
pub struct VocabEncoder {
    axes: HashMap<String, usize>,
    dimension: VectorDimension,
}

impl VocabEncoder {
    pub fn new<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut axes = HashMap::new();
        for text in texts {
            for token in text.split_whitespace() {
                let next = axes.len();
                axes.entry(token.to_lowercase()).or_insert(next);
            }
        }
        let dimension = VectorDimension::new(axes.len().max(1)).expect("non-zero dimension");
        Self { axes, dimension }
    }

    /// Vocabulary drawn from a corpus plus extra query texts.
    pub fn for_corpus(corpus: &BTreeMap<DocumentId, String>, queries: &[&str]) -> Self {
        Self::new(
            corpus
                .values()
                .map(String::as_str)
                .chain(queries.iter().copied()),
        )
    }
}

impl TextEncoder for VocabEncoder {
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; self.dimension.get()];
                for token in text.split_whitespace() {
                    if let Some(&axis) = self.axes.get(&token.to_lowercase()) {
                        vector[axis] += 1.0;
                    }
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "vocab"
    }
}

/// Wraps an encoder and records every call.
pub struct CountingEncoder {
    inner: Arc<dyn TextEncoder>,
    calls: AtomicUsize,
    texts: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
    fail: AtomicBool,
}

impl CountingEncoder {
    pub fn new(inner: Arc<dyn TextEncoder>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total texts across all calls, including single-text query calls.
    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.texts.store(0, Ordering::SeqCst);
        self.batches.lock().clear();
    }

    /// Makes every following call fail until switched back.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl TextEncoder for CountingEncoder {
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.batches
            .lock()
            .push(texts.iter().map(|t| t.to_string()).collect());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VectorError::EmbeddingFailed("model crashed".to_string()));
        }
        self.inner.encode_batch(texts)
    }

    fn dimension(&self) -> VectorDimension {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Cache whose storage is always unreachable.
pub struct UnavailableCache;

fn unavailable() -> CacheError {
    CacheError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "cache storage unreachable",
    ))
}

impl EmbeddingCache for UnavailableCache {
    fn get(&self, _: &DocumentId, _: &Fingerprint) -> CacheResult<Option<Embedding>> {
        Err(unavailable())
    }

    fn put(&self, _: &DocumentId, _: &[f32], _: &Fingerprint) -> CacheResult<()> {
        Err(unavailable())
    }

    fn all(&self) -> CacheResult<HashMap<DocumentId, Embedding>> {
        Err(unavailable())
    }

    fn records(&self) -> CacheResult<Vec<CacheRecord>> {
        Err(unavailable())
    }

    fn len(&self) -> CacheResult<usize> {
        Err(unavailable())
    }

    fn clear(&self) -> CacheResult<()> {
        Err(unavailable())
    }
}
