//! Lexical explanation of semantic hits.
//!
//! Tokenization is deliberately naive: lowercase, split on whitespace, no
//! stemming and no punctuation stripping. `"pets."` and `"pets"` are
//! different tokens.

use std::collections::BTreeSet;

use super::result::Explanation;

/// Default number of preview characters.
pub const DEFAULT_PREVIEW_CHARS: usize = 150;

/// Default cap on reported overlapping keywords.
pub const DEFAULT_MAX_KEYWORDS: usize = 5;

const ELLIPSIS: &str = "...";

/// First `max_chars` characters of `text`, followed by `...` if anything was cut.
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Distinct lowercase whitespace tokens.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Number of whitespace-separated tokens, duplicates included.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Rounds to two decimal places.
fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Builds the explanation for one hit from already-tokenized query words.
///
/// `overlap_ratio` is 0 when the query has no tokens.
pub fn explain(
    query_tokens: &BTreeSet<String>,
    document: &str,
    score: f32,
    max_keywords: usize,
) -> Explanation {
    let document_tokens = tokenize(document);
    let overlap: Vec<&String> = query_tokens.intersection(&document_tokens).collect();

    let overlap_ratio = if query_tokens.is_empty() {
        0.0
    } else {
        round2(overlap.len() as f32 / query_tokens.len() as f32)
    };

    Explanation {
        semantic_similarity: score,
        overlapping_keywords: overlap
            .into_iter()
            .take(max_keywords)
            .cloned()
            .collect(),
        overlap_ratio,
        document_word_count: word_count(document),
    }
}
