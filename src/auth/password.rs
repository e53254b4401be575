//! Password hashing with Argon2id.
//!
//! Hashes are PHC strings that embed their own random salt, so no salt is
//! stored separately.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password")]
    Hashing,
    #[error("password does not match")]
    Mismatch,
    #[error("stored password hash is not a valid PHC string")]
    InvalidHash,
}

/// Hash a plaintext password with a freshly generated salt.
///
/// Two calls with the same input return different strings; both verify.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::Hashing)?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC hash.
///
/// The digest comparison is constant-time.
pub fn verify_password(hash: &str, password: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}
