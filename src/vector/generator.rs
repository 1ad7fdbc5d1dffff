//! Cache-aware embedding generation.
//!
//! Wraps a [`TextEncoder`] with:
//! - per-vector L2 normalization (with an explicit zero-norm guard)
//! - fingerprint-validated lookups in an [`EmbeddingCache`]
//! - batching of every cache miss into as few encoder calls as possible
//!
//! Cache failures never fail generation. They are logged and the affected
//! documents are recomputed. Encoder failures always fail the whole call.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::EmbeddingCache;
use crate::error::{EngineResult, SearchError};
use crate::fingerprint::compute_fingerprint;
use crate::types::{DocumentId, Embedding, Fingerprint};
use crate::vector::similarity::normalize_in_place;
use crate::vector::{TextEncoder, VectorDimension};

/// Default upper bound on texts per encoder call.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Outcome of one [`EmbeddingGenerator::embed_documents_detailed`] call.
#[derive(Debug, Default, Clone)]
pub struct EmbeddingRun {
    /// Exactly one entry per input document id
    pub embeddings: HashMap<DocumentId, Embedding>,
    /// Documents resolved from the cache
    pub cache_hits: usize,
    /// Documents sent to the encoder
    pub computed: usize,
    /// Number of encoder calls issued
    pub encoder_calls: usize,
    /// Documents whose vector has zero norm and was kept as the zero vector
    pub degenerate: Vec<DocumentId>,
    /// Cache reads or writes that failed and were absorbed
    pub cache_errors: usize,
}

struct PendingDocument<'a> {
    id: DocumentId,
    text: &'a str,
    fingerprint: Fingerprint,
}

/// Produces unit-norm embeddings, consulting the cache before the encoder.
pub struct EmbeddingGenerator {
    encoder: Arc<dyn TextEncoder>,
    cache: Option<Arc<dyn EmbeddingCache>>,
    batch_size: usize,
}

impl std::fmt::Debug for EmbeddingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGenerator")
            .field("model", &self.encoder.model_name())
            .field("dimension", &self.encoder.dimension())
            .field("cached", &self.cache.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl EmbeddingGenerator {
    /// Creates a generator without a cache; every document is encoded.
    pub fn new(encoder: Arc<dyn TextEncoder>) -> Self {
        Self {
            encoder,
            cache: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Attaches a write-through cache.
    pub fn with_cache(mut self, cache: Arc<dyn EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the maximum number of texts per encoder call (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dimension(&self) -> VectorDimension {
        self.encoder.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.encoder.model_name()
    }

    pub fn cache(&self) -> Option<&Arc<dyn EmbeddingCache>> {
        self.cache.as_ref()
    }

    /// Content fingerprint used as the cache validity key.
    pub fn fingerprint(&self, text: &str) -> Fingerprint {
        compute_fingerprint(text)
    }

    /// Embeds a single text with one encoder call and normalizes it.
    ///
    /// A zero-norm raw vector is returned unchanged (all zeros) and logged.
    pub fn embed_text(&self, text: &str) -> EngineResult<Embedding> {
        let mut embedding = self.encoder.encode(text)?;
        self.check_vector(&embedding)?;
        if !normalize_in_place(&mut embedding) {
            warn!(
                "Encoder produced a zero-norm vector for text of {} bytes; returning zero vector",
                text.len()
            );
        }
        Ok(embedding)
    }

    /// Embeds every document, serving unchanged ones from the cache.
    ///
    /// Returns one embedding per input id. See
    /// [`embed_documents_detailed`](Self::embed_documents_detailed) for counters.
    pub fn embed_documents<'a, I>(
        &self,
        docs: I,
        force_recompute: bool,
    ) -> EngineResult<HashMap<DocumentId, Embedding>>
    where
        I: IntoIterator<Item = (&'a DocumentId, &'a str)>,
    {
        Ok(self.embed_documents_detailed(docs, force_recompute)?.embeddings)
    }

    /// Embeds every document and reports cache hits, misses and degenerate vectors.
    ///
    /// # Algorithm
    /// 1. Fingerprint each document
    /// 2. Unless `force_recompute`, resolve cache hits without the encoder
    /// 3. Encode all misses in batches of at most `batch_size`
    /// 4. Normalize each vector on its own, write it back, merge it
    ///
    /// # Errors
    /// [`SearchError::EncoderFailure`] if any encoder call fails or returns a
    /// malformed batch. Nothing from a failed call is returned.
    pub fn embed_documents_detailed<'a, I>(
        &self,
        docs: I,
        force_recompute: bool,
    ) -> EngineResult<EmbeddingRun>
    where
        I: IntoIterator<Item = (&'a DocumentId, &'a str)>,
    {
        let mut run = EmbeddingRun::default();
        let mut pending = Vec::new();

        for (id, text) in docs {
            let fingerprint = self.fingerprint(text);

            if !force_recompute {
                if let Some(embedding) = self.lookup_cached(id, &fingerprint, &mut run) {
                    if embedding.iter().all(|x| *x == 0.0) {
                        run.degenerate.push(id.clone());
                    }
                    run.cache_hits += 1;
                    run.embeddings.insert(id.clone(), embedding);
                    continue;
                }
            }

            pending.push(PendingDocument {
                id: id.clone(),
                text,
                fingerprint,
            });
        }

        if !pending.is_empty() {
            info!(
                "Embedding {} new/changed documents with {}",
                pending.len(),
                self.encoder.model_name()
            );
        }

        for chunk in pending.chunks(self.batch_size) {
            let texts: Vec<&str> = chunk.iter().map(|doc| doc.text).collect();
            let raw = self.encoder.encode_batch(&texts)?;
            run.encoder_calls += 1;

            if raw.len() != chunk.len() {
                return Err(SearchError::EncoderFailure(format!(
                    "encoder returned {} vectors for {} texts",
                    raw.len(),
                    chunk.len()
                )));
            }

            // validate the whole batch before anything is cached
            for embedding in &raw {
                self.check_vector(embedding)?;
            }

            for (doc, mut embedding) in chunk.iter().zip(raw) {
                if !normalize_in_place(&mut embedding) {
                    warn!(
                        "Document '{}' embeds to a zero-norm vector; keeping zero vector",
                        doc.id
                    );
                    run.degenerate.push(doc.id.clone());
                }
                self.store_cached(&doc.id, &embedding, &doc.fingerprint, &mut run);
                run.computed += 1;
                run.embeddings.insert(doc.id.clone(), embedding);
            }
        }

        debug!(
            "Embedding run complete: {} total, {} cached, {} computed in {} encoder call(s)",
            run.embeddings.len(),
            run.cache_hits,
            run.computed,
            run.encoder_calls
        );
        Ok(run)
    }

    /// Rejects raw encoder output of the wrong length or with NaN/infinite components.
    fn check_vector(&self, embedding: &[f32]) -> EngineResult<()> {
        let expected = self.encoder.dimension().get();
        if embedding.len() != expected {
            return Err(SearchError::EncoderFailure(format!(
                "encoder returned a {}-dimensional vector, expected {expected}",
                embedding.len()
            )));
        }
        if let Some(position) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(SearchError::EncoderFailure(format!(
                "encoder returned a non-finite value ({}) at position {position}",
                embedding[position]
            )));
        }
        Ok(())
    }

    fn lookup_cached(
        &self,
        id: &DocumentId,
        fingerprint: &Fingerprint,
        run: &mut EmbeddingRun,
    ) -> Option<Embedding> {
        let cache = self.cache.as_ref()?;
        match cache.get(id, fingerprint) {
            Ok(Some(embedding)) if embedding.len() == self.encoder.dimension().get() => {
                Some(embedding)
            }
            Ok(Some(embedding)) => {
                debug!(
                    "Cached vector for '{id}' has dimension {}, encoder produces {}; recomputing",
                    embedding.len(),
                    self.encoder.dimension()
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Embedding cache read failed for '{id}', recomputing: {e}");
                run.cache_errors += 1;
                None
            }
        }
    }

    fn store_cached(
        &self,
        id: &DocumentId,
        embedding: &[f32],
        fingerprint: &Fingerprint,
        run: &mut EmbeddingRun,
    ) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(id, embedding, fingerprint) {
                warn!("Embedding cache write failed for '{id}': {e}");
                run.cache_errors += 1;
            }
        }
    }
}
