//! Result records returned by [`SearchEngine::search`](super::SearchEngine::search).

use serde::{Deserialize, Serialize};

use crate::types::DocumentId;

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocumentId,
    /// Inner product of the unit query and document vectors
    pub score: f32,
    /// Leading characters of the document, with `...` when truncated
    pub preview: String,
    pub explanation: Explanation,
}

/// Human-inspectable reasons for a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Same value as [`SearchResult::score`]
    pub semantic_similarity: f32,
    /// Query words that also occur in the document, sorted, at most a handful
    pub overlapping_keywords: Vec<String>,
    /// Fraction of distinct query words found in the document, two decimals
    pub overlap_ratio: f32,
    /// Whitespace-separated token count of the full document
    pub document_word_count: usize,
}
