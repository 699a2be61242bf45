//! Content hashing for posting descriptions
//!
//! Two postings published under different identities frequently carry the exact
//! same description text (re-posts, regional duplicates). The SHA-256 digest of the
//! raw description is stored next to each record so enrichment can be reused.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the raw description, or `None` when it is empty.
///
/// The text is hashed byte-for-byte: no trimming or case folding, so only
/// identical descriptions share a digest.
pub fn description_hash(description: &str) -> Option<String> {
    if description.is_empty() {
        return None;
    }

    Some(sha256_hex(description.as_bytes()))
}

/// Hex-encoded SHA-256 of arbitrary bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
