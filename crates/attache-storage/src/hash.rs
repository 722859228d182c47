//! Content hashing and token generation

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// SHA-256 digest of a byte payload, hex-encoded (64 chars)
pub fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Random hex token of the given length, for non-content-derived naming
/// (staging files, remote-ingest filename stems).
pub fn random_token(len: usize) -> String {
    let mut token = String::with_capacity(len);
    while token.len() < len {
        token.push_str(&hex::encode(Uuid::new_v4().as_bytes()));
    }
    token.truncate(len);
    token
}
