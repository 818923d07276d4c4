//! Password hashing and verification
//!
//! This module provides functions for hashing and verifying account
//! passwords. Hashes use Argon2id in PHC string format, which embeds the
//! algorithm tag, parameters and salt, so verification needs no external
//! state.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::error::HashError;

/// Hash a password using Argon2id with default parameters
///
/// Each call generates a fresh random salt, so hashing the same password
/// twice yields different strings that both verify.
///
/// # Arguments
///
/// * `password` - The plaintext password to hash
///
/// # Returns
///
/// The Argon2id hash string (PHC format)
///
/// # Errors
///
/// Returns an error if hashing fails (should not happen in normal operation)
///
/// # Example
///
/// ```
/// use contacts_api::auth::password::hash_password;
///
/// let hash = hash_password("s3cr3t").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, HashError> {
    hash_password_with(password, &Argon2::default())
}

/// Hash a password with explicit Argon2 parameters
///
/// The work factor is tunable through [`Params`]; the default parameters
/// are adequate for interactive login. Lower-cost parameters are only
/// appropriate in tests.
pub fn hash_password_with(password: &str, argon2: &Argon2) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError::HashFailed(e.to_string()))
}

/// Build an Argon2id instance with a custom memory/time cost
///
/// # Errors
///
/// Returns an error if the parameters are outside Argon2's accepted ranges
pub fn hasher_with_cost(
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
) -> Result<Argon2<'static>, HashError> {
    let params = Params::new(m_cost, t_cost, p_cost, None)
        .map_err(|e| HashError::HashFailed(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Verify a password against a stored hash
///
/// # Arguments
///
/// * `password` - The plaintext password to verify
/// * `hash` - The stored Argon2id hash
///
/// # Returns
///
/// `true` if the password matches the hash, `false` otherwise. A malformed
/// stored hash verifies as `false` and never raises.
///
/// # Example
///
/// ```
/// use contacts_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("s3cr3t").unwrap();
/// assert!(verify_password("s3cr3t", &hash));
/// assert!(!verify_password("wrong", &hash));
/// ```
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
