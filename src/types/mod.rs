use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Embedding vector as produced by an encoder.
///
/// Every embedding stored in the cache or the index has unit L2 norm, except
/// the zero vector produced for degenerate input.
pub type Embedding = Vec<f32>;

/// Stable identifier of a document within a corpus snapshot.
///
/// Derived from the source filename stem by the corpus loader. Ordering is
/// lexical, which fixes the insertion order of the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for DocumentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Hex-encoded SHA-256 digest of a document's raw text.
///
/// Two documents with the same fingerprint are assumed to embed identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of the hex encoding (256 bits).
    pub const HEX_LEN: usize = 64;

    /// Wraps an already computed hex digest.
    ///
    /// Returns `None` unless the value is exactly 64 lowercase hex characters.
    pub fn from_hex(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        let valid = hex.len() == Self::HEX_LEN
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then_some(Self(hex))
    }

    pub(crate) fn from_digest_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
