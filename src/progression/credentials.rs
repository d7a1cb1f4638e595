//! Argon2id credential hashing for player registration.
//!
//! The progression core never interprets the hash; it only stores the PHC
//! string produced here.

use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::progression::errors::ProgressionError;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

pub fn hash_password(password: &str) -> Result<String, ProgressionError> {
    if password.len() < PASSWORD_MIN_LEN {
        return Err(ProgressionError::bad_request(format!(
            "password too short (min {})",
            PASSWORD_MIN_LEN
        )));
    }
    if password.len() > PASSWORD_MAX_LEN {
        return Err(ProgressionError::bad_request("password too long"));
    }
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ProgressionError::Credential(format!("password hash failure: {e}")))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. A corrupt hash is an error,
/// a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, ProgressionError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ProgressionError::Credential(format!("corrupt password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
