//! Shared SHA-256 hex digest utility.
//!
//! Tokens are never stored or used as cache keys in plaintext; every lookup
//! goes through [`token_digest`].

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Digest of a bearer token as stored in session rows and registry keys.
pub fn token_digest(token: &str) -> String {
    sha256_hex(token.as_bytes())
}
