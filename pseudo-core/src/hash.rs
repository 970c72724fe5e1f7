//! SHA-256 content hashing shared by the file store and the sync engine.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `body` with line endings normalised to LF.
pub fn content_hash(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}
