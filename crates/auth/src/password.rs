//! Password hashing and verification (Argon2id).
//!
//! Secrets are hashed with a per-hash random salt into PHC strings; the clear
//! secret never leaves the call frame and is never logged. Verification goes
//! through [`PasswordVerifier`], which compares in constant time.

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Hashing failed or a stored hash did not parse as a PHC string.
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a secret into an Argon2id PHC string.
pub fn hash_password(secret: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a presented secret against a stored PHC string.
///
/// A mismatch is `Ok(false)`; only a corrupt stored hash is an error.
pub fn verify_password(secret: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}
