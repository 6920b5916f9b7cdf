//! Password hashing with Argon2id in PHC string format.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;

/// Hashing failed; the underlying cause is not propagated to avoid leaking
/// parameter details into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("password hashing failed")]
pub struct HashError;

/// Hash `password` with a fresh random salt.
///
/// # Errors
/// [`HashError`] if the hasher rejects its input; does not happen for
/// ordinary UTF-8 passwords.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| HashError)
}

/// Verify `password` against a stored PHC hash string.
///
/// Fails closed: a malformed stored hash verifies as `false` rather than
/// erroring, so a corrupted row cannot be logged into.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
