//! SHA-256 content fingerprints used as cache-validity keys

use crate::types::Fingerprint;
use sha2::{Digest, Sha256};

/// Compute the fingerprint of document text
///
/// Hashes the exact UTF-8 bytes; no normalization is applied, so any byte
/// difference (including whitespace or case) yields a different fingerprint.
pub fn compute_fingerprint(text: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    Fingerprint::from_digest_hex(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let first = compute_fingerprint("the cat sat on the mat");
        let second = compute_fingerprint("the cat sat on the mat");
        assert_eq!(first, second);
    }

    #[test]
    fn fingerprint_differs_for_different_content() {
        let lower = compute_fingerprint("Hello, world!");
        let upper = compute_fingerprint("Hello, World!");
        let trailing = compute_fingerprint("Hello, world! ");
        assert_ne!(lower, upper);
        assert_ne!(lower, trailing);
    }

    #[test]
    fn fingerprint_is_64_lowercase_hex_chars() {
        let fingerprint = compute_fingerprint("any content");
        assert_eq!(fingerprint.as_str().len(), Fingerprint::HEX_LEN);
        assert!(Fingerprint::from_hex(fingerprint.as_str()).is_some());
    }

    #[test]
    fn fingerprint_matches_known_sha256() {
        // sha256("") is a fixed, published value
        assert_eq!(
            compute_fingerprint("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
