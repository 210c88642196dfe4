//! Content hashing (spec.md §3.5, §6.2): a collision-resistant hash of
//! at least 128 bits over a case's canonical serialization, printable as
//! hex.

use sha2::{Digest, Sha256};

/// Hash the canonical DSL text of a case version. SHA-256 gives a 256-bit
/// digest, comfortably over the spec's 128-bit floor.
pub fn content_hash(canonical_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_at_least_32_hex_chars() {
        let h = content_hash("(kyc-case X (kyc-token \"pending\"))");
        assert!(h.len() >= 32);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let text = "(kyc-case X (kyc-token \"pending\"))";
        assert_eq!(content_hash(text), content_hash(text));
    }

    #[test]
    fn different_text_hashes_differently() {
        assert_ne!(
            content_hash("(kyc-case X (kyc-token \"pending\"))"),
            content_hash("(kyc-case Y (kyc-token \"pending\"))")
        );
    }
}
