//! Random token generation and at-rest digesting.
//!
//! Raw tokens are 32 random bytes hex-encoded (256 bits of entropy); only
//! the SHA-256 digest is ever persisted, so a database leak does not yield
//! usable reset links.

use sha2::{Digest, Sha256};

/// Generate a raw token (64-character hex string).
#[must_use]
pub fn generate_raw_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// SHA-256 digest of a raw token, hex-encoded, for storage and lookup.
#[must_use]
pub fn digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
