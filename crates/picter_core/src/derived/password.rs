//! One-way password digests.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `plaintext`.
pub fn hash_password(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recomputes the digest of `plaintext` and compares it with `digest`.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    hash_password(plaintext) == digest
}
