//! Password and session credential helpers
//!
//! # Architecture
//!
//! Passwords are stored as salted SHA-256 digests (`users.password_hash` +
//! `users.password_salt`); session tokens are opaque UUID v4 strings held in
//! the `sessions` table and carried by an HTTP-only cookie.
//!
//! This module contains ONLY pure functions. No HTTP framework dependencies -
//! cookie handling lives in the API crate.

use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a random password salt as 32 hex characters
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Calculate the stored digest for a password + salt pair
///
/// Digest input is `salt || password`; output is 64 hex characters.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a candidate password against the stored salt and digest
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    hash_password(password, salt) == stored_hash
}

/// Generate an opaque session token
pub fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}
