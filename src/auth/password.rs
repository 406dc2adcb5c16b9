//! Password hashing
//!
//! Stored form is `{salt_hex}${digest_hex}` where the digest is
//! SHA-256 over the salt followed by the password. Verification
//! recomputes the digest with the stored salt.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    let digest = salted_digest(&salt_hex, password);
    format!("{}${}", salt_hex, digest)
}

/// Check a password against a stored hash. Malformed stored values
/// never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt_hex, digest)) => salted_digest(salt_hex, password) == digest,
        None => false,
    }
}

fn salted_digest(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
