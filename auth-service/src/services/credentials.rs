//! Credential store - password digests and remember-me token values.
//!
//! Digests are deterministic hex SHA-256 over a salt-wrapped input; there is
//! no decryption path. Remember-me tokens are themselves digests of the
//! account email and the expiry instant, not a separate secret.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::error::ServiceError;
use crate::models::User;

/// Digest of the salt-wrapped password. Same inputs, same output.
pub fn encrypt(password: &str, salt: &str) -> String {
    digest(&format!("--{}--{}--", salt, password))
}

/// Per-account salt mixed from the creation instant and the login. Only
/// computed when a new account sets a password; password resets keep the
/// existing salt.
pub fn generate_salt(login: &str, now: DateTime<Utc>) -> String {
    digest(&format!("--{}--{}--", now.to_rfc3339(), login))
}

/// Recompute the digest with the account's stored salt and compare.
pub fn verify(user: &User, password: &str) -> bool {
    match (&user.crypted_password, &user.salt) {
        (Some(crypted), Some(salt)) => *crypted == encrypt(password, salt),
        _ => false,
    }
}

/// Remember-me token value for an account and expiry instant.
pub fn remember_token(email: &str, expires_utc: DateTime<Utc>) -> String {
    digest(&format!("{}--{}", email, expires_utc.to_rfc3339()))
}

/// Password-change validations: presence, length 4-40, confirmation match.
///
/// Callers enforce these only when a password change is actually required
/// (new local account, or a local account resetting its password); the
/// directory strategy bypasses them entirely.
pub fn validate_password_change(
    password: &str,
    confirmation: &str,
) -> Result<(), ServiceError> {
    if password.is_empty() {
        return Err(ServiceError::validation("password", "can't be blank"));
    }
    let length = password.chars().count();
    if !(4..=40).contains(&length) {
        return Err(ServiceError::validation(
            "password",
            "must be between 4 and 40 characters",
        ));
    }
    if password != confirmation {
        return Err(ServiceError::validation(
            "password_confirmation",
            "doesn't match password",
        ));
    }
    Ok(())
}

fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
