//! Snapshot-swapping search engine.
//!
//! A build produces an immutable snapshot (index plus document
//! texts) and publishes it by swapping one `Arc` under a short write lock.
//! Readers clone the current `Arc` and work without holding any lock, so a
//! rebuild never blocks or tears an in-flight search.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};

use super::explain::{self, DEFAULT_MAX_KEYWORDS, DEFAULT_PREVIEW_CHARS};
use super::result::SearchResult;
use crate::corpus::load_corpus;
use crate::error::{EngineResult, SearchError};
use crate::types::DocumentId;
use crate::vector::{EmbeddingGenerator, FlatIndex, VectorDimension};

/// Lifecycle of a [`SearchEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No build has succeeded yet
    Uninitialized,
    /// A build is running; searches use the previous snapshot if any
    Building,
    /// A snapshot is published
    Ready,
}

/// Tunables for result presentation and rebuilds.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub preview_chars: usize,
    pub max_keywords: usize,
    /// Ignore cached embeddings on every build
    pub force_recompute: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
            max_keywords: DEFAULT_MAX_KEYWORDS,
            force_recompute: false,
        }
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub dimension: usize,
    pub cache_hits: usize,
    pub computed: usize,
    pub degenerate: Vec<DocumentId>,
    pub elapsed: Duration,
}

/// Raises the building flag and lowers it on drop, including during unwinding.
struct BuildingFlag<'a>(&'a AtomicBool);

impl<'a> BuildingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for BuildingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything one build publishes, replaced as a unit.
#[derive(Debug)]
struct IndexSnapshot {
    index: FlatIndex,
    texts: BTreeMap<DocumentId, String>,
}

/// Semantic search over a fixed corpus with lexical explanations.
///
/// Owned by the host (wrap it in an `Arc` to share); there is no global
/// instance.
pub struct SearchEngine {
    generator: EmbeddingGenerator,
    options: SearchOptions,
    snapshot: RwLock<Option<Arc<IndexSnapshot>>>,
    build_lock: Mutex<()>,
    building: AtomicBool,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("generator", &self.generator)
            .field("state", &self.state())
            .field("documents", &self.document_count())
            .finish()
    }
}

impl SearchEngine {
    pub fn new(generator: EmbeddingGenerator) -> Self {
        Self::with_options(generator, SearchOptions::default())
    }

    pub fn with_options(generator: EmbeddingGenerator, options: SearchOptions) -> Self {
        Self {
            generator,
            options,
            snapshot: RwLock::new(None),
            build_lock: Mutex::new(()),
            building: AtomicBool::new(false),
        }
    }

    pub fn generator(&self) -> &EmbeddingGenerator {
        &self.generator
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        if self.building.load(Ordering::Acquire) {
            EngineState::Building
        } else if self.snapshot.read().is_some() {
            EngineState::Ready
        } else {
            EngineState::Uninitialized
        }
    }

    /// Number of documents in the published snapshot, 0 before the first build.
    pub fn document_count(&self) -> usize {
        self.current().map_or(0, |s| s.index.len())
    }

    /// Vector dimension of the published snapshot.
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.current().map(|s| s.index.dimension())
    }

    fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot.read().clone()
    }

    fn ready_snapshot(&self) -> EngineResult<Arc<IndexSnapshot>> {
        self.current().ok_or(SearchError::IndexNotBuilt)
    }

    /// Embeds the corpus and publishes a fresh index over it.
    ///
    /// Builds are serialized; a concurrent caller waits for the running one.
    ///
    /// # Errors
    /// - [`SearchError::EmptyCorpus`] when `corpus` is empty
    /// - [`SearchError::EncoderFailure`] when embedding fails
    /// - [`SearchError::DimensionMismatch`] when the encoder is inconsistent
    ///
    /// On error the previously published snapshot (if any) stays in place.
    pub fn build_index(&self, corpus: BTreeMap<DocumentId, String>) -> EngineResult<BuildReport> {
        if corpus.is_empty() {
            return Err(SearchError::EmptyCorpus);
        }

        let _guard = self.build_lock.lock();
        let result = {
            let _building = BuildingFlag::raise(&self.building);
            self.build_snapshot(corpus)
        };

        let (snapshot, report) = result?;
        *self.snapshot.write() = Some(Arc::new(snapshot));

        info!(
            "Index built with {} documents ({} cached, {} computed) in {:.2?}",
            report.documents, report.cache_hits, report.computed, report.elapsed
        );
        Ok(report)
    }

    fn build_snapshot(
        &self,
        texts: BTreeMap<DocumentId, String>,
    ) -> EngineResult<(IndexSnapshot, BuildReport)> {
        let started = Instant::now();

        let run = self.generator.embed_documents_detailed(
            texts.iter().map(|(id, text)| (id, text.as_str())),
            self.options.force_recompute,
        )?;
        let mut embeddings = run.embeddings;

        // BTreeMap iteration gives lexical id order
        let mut entries = Vec::with_capacity(texts.len());
        for id in texts.keys() {
            let vector = embeddings.remove(id).ok_or_else(|| {
                SearchError::EncoderFailure(format!("no embedding produced for '{id}'"))
            })?;
            entries.push((id.clone(), vector));
        }

        let index = FlatIndex::build(entries)?;
        let report = BuildReport {
            documents: index.len(),
            dimension: index.dimension().get(),
            cache_hits: run.cache_hits,
            computed: run.computed,
            degenerate: run.degenerate,
            elapsed: started.elapsed(),
        };
        Ok((IndexSnapshot { index, texts }, report))
    }

    /// Loads `*.txt` files from `dir` and builds over them.
    pub fn build_from_dir(&self, dir: impl AsRef<Path>) -> EngineResult<BuildReport> {
        let corpus = load_corpus(dir.as_ref())?;
        self.build_index(corpus)
    }

    /// Returns the `top_k` documents most similar to `query`, best first.
    ///
    /// # Returns
    /// `min(top_k, document_count())` results. Blank queries are not rejected
    /// here; they embed to the zero vector and every document scores 0.
    ///
    /// # Errors
    /// [`SearchError::IndexNotBuilt`] before the first successful build, or
    /// [`SearchError::EncoderFailure`] if the query cannot be embedded.
    pub fn search(&self, query: &str, top_k: usize) -> EngineResult<Vec<SearchResult>> {
        let snapshot = self.ready_snapshot()?;

        let query_vector = self.generator.embed_text(query)?;
        let hits = snapshot.index.search(&query_vector, top_k)?;
        debug!("Query '{query}' matched {} document(s)", hits.len());

        let query_tokens = explain::tokenize(query);
        let results = hits
            .into_iter()
            .map(|(doc_id, score)| {
                let text = snapshot.texts.get(&doc_id).map_or("", String::as_str);
                SearchResult {
                    preview: explain::preview(text, self.options.preview_chars),
                    explanation: explain::explain(
                        &query_tokens,
                        text,
                        score,
                        self.options.max_keywords,
                    ),
                    doc_id,
                    score,
                }
            })
            .collect();
        Ok(results)
    }

    /// Full text of a document in the published snapshot.
    ///
    /// # Errors
    /// [`SearchError::IndexNotBuilt`] before the first successful build.
    pub fn get_document(&self, doc_id: &str) -> EngineResult<Option<String>> {
        let snapshot = self.ready_snapshot()?;
        Ok(snapshot.texts.get(doc_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::HashingEncoder;

    fn engine() -> SearchEngine {
        SearchEngine::new(EmbeddingGenerator::new(Arc::new(HashingEncoder::default())))
    }

    fn corpus(docs: &[(&str, &str)]) -> BTreeMap<DocumentId, String> {
        docs.iter()
            .map(|(id, text)| (DocumentId::from(*id), text.to_string()))
            .collect()
    }

    #[test]
    fn test_new_engine_is_uninitialized() {
        let engine = engine();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.document_count(), 0);
        assert!(engine.dimension().is_none());
        assert!(matches!(engine.search("x", 3), Err(SearchError::IndexNotBuilt)));
        assert!(matches!(engine.get_document("a"), Err(SearchError::IndexNotBuilt)));
    }

    #[test]
    fn test_build_then_search() {
        let engine = engine();
        let report = engine
            .build_index(corpus(&[
                ("a", "rust ownership and borrowing"),
                ("b", "baking sourdough bread at home"),
            ]))
            .unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.dimension, 384);
        assert_eq!(report.computed, 2);
        assert_eq!(engine.state(), EngineState::Ready);

        let results = engine.search("rust ownership and borrowing", 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doc_id.as_str(), "a");
        assert!((results[0].score - 1.0).abs() < 1e-4);
        assert_eq!(results[0].explanation.overlap_ratio, 1.0);
    }

    #[test]
    fn test_failed_build_keeps_previous_snapshot() {
        let engine = engine();
        engine.build_index(corpus(&[("a", "first corpus")])).unwrap();

        assert!(matches!(
            engine.build_index(BTreeMap::new()),
            Err(SearchError::EmptyCorpus)
        ));
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.get_document("a").unwrap().as_deref(), Some("first corpus"));
    }

    #[test]
    fn test_rebuild_replaces_documents() {
        let engine = engine();
        engine.build_index(corpus(&[("a", "old"), ("b", "other")])).unwrap();
        engine.build_index(corpus(&[("c", "new")])).unwrap();

        assert_eq!(engine.document_count(), 1);
        assert_eq!(engine.get_document("a").unwrap(), None);
        assert_eq!(engine.get_document("c").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_preview_and_top_k_bounds() {
        let engine = engine();
        let long = "word ".repeat(100);
        engine
            .build_index(corpus(&[("long", &long), ("short", "word")]))
            .unwrap();

        assert!(engine.search("word", 0).unwrap().is_empty());

        let results = engine.search("word", 10).unwrap();
        assert_eq!(results.len(), 2);
        let long_hit = results.iter().find(|r| r.doc_id.as_str() == "long").unwrap();
        assert!(long_hit.preview.ends_with("..."));
        assert_eq!(long_hit.preview.chars().count(), 153);
        assert_eq!(long_hit.explanation.document_word_count, 100);
    }

    #[test]
    fn test_blank_query_scores_zero() {
        let engine = engine();
        engine
            .build_index(corpus(&[("a", "alpha"), ("b", "beta")]))
            .unwrap();

        let results = engine.search("   ", 2).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(results.iter().all(|r| r.score == 0.0));
        assert!(results.iter().all(|r| r.explanation.overlap_ratio == 0.0));
    }

    struct PanickingEncoder;

    impl crate::vector::TextEncoder for PanickingEncoder {
        fn encode_batch(
            &self,
            _texts: &[&str],
        ) -> Result<Vec<Vec<f32>>, crate::vector::VectorError> {
            panic!("encoder crashed");
        }

        fn dimension(&self) -> VectorDimension {
            VectorDimension::new(4).unwrap()
        }

        fn model_name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn test_panicking_build_does_not_stay_building() {
        let engine = SearchEngine::new(EmbeddingGenerator::new(Arc::new(PanickingEncoder)));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.build_index(corpus(&[("a", "alpha")]))
        }));
        assert!(outcome.is_err());
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }
}
