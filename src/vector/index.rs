//! Exact flat inner-product index.
//!
//! Every query is compared against every stored vector. Stored vectors are
//! expected to be unit length, so the inner product is the cosine similarity
//! and no norms are recomputed at query time.

use rayon::prelude::*;

use crate::types::DocumentId;
use crate::vector::similarity::dot;
use crate::vector::{VectorDimension, VectorError};

/// Immutable flat index over a fixed set of `(DocumentId, vector)` entries.
///
/// Vectors live in one contiguous row-major buffer of `len() * dimension()`
/// floats. Row order is insertion order and is also the tie-break order for
/// equal scores.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    ids: Vec<DocumentId>,
    vectors: Vec<f32>,
    dimension: VectorDimension,
}

impl FlatIndex {
    /// Builds a new index from an ordered sequence of entries.
    ///
    /// The dimension is fixed by the first vector.
    ///
    /// # Errors
    /// - [`VectorError::EmptyIndex`] when `entries` is empty
    /// - [`VectorError::InvalidDimension`] when the first vector is empty
    /// - [`VectorError::DimensionMismatch`] when any later vector differs in length
    pub fn build(entries: Vec<(DocumentId, Vec<f32>)>) -> Result<Self, VectorError> {
        let first = entries.first().ok_or(VectorError::EmptyIndex)?;
        let dimension = VectorDimension::new(first.1.len())?;

        let mut ids = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len() * dimension.get());
        for (id, vector) in entries {
            dimension.validate_vector(&vector)?;
            ids.push(id);
            vectors.extend_from_slice(&vector);
        }

        Ok(Self {
            ids,
            vectors,
            dimension,
        })
    }

    /// Searches for the `top_k` entries with the highest inner product.
    ///
    /// # Returns
    /// `min(top_k, len())` pairs sorted by descending score. Equal scores
    /// keep insertion order. `top_k == 0` yields an empty vector.
    ///
    /// # Errors
    /// [`VectorError::DimensionMismatch`] if the query has the wrong length.
    #[must_use = "Search results should be processed to retrieve relevant documents"]
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<(DocumentId, f32)>, VectorError> {
        self.dimension.validate_vector(query)?;

        if top_k == 0 {
            return Ok(Vec::new());
        }

        // collect() on an indexed parallel iterator keeps row order
        let scores: Vec<f32> = self
            .vectors
            .par_chunks_exact(self.dimension.get())
            .map(|row| dot(query, row))
            .collect();

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        // stable sort: ties (including +0.0 vs -0.0) stay in insertion order
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|row| (self.ids[row].clone(), scores[row]))
            .collect())
    }

    /// Gets the number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Gets the vector dimension.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

}
