//! Auth keys: a per-user integer secret compared by exact equality.
//!
//! Candidates arrive as text. They are parsed strictly as a base-10 `i32`;
//! anything else (`"42x"`, `" 42"`, `""`) is rejected rather than coerced.

use rand::Rng;

use crate::services::auth_service::AuthError;

pub fn parse_auth_key(candidate: &str) -> Result<i32, AuthError> {
    candidate
        .parse::<i32>()
        .map_err(|e| AuthError::InvalidAuthKey(format!("'{candidate}' is not an integer ({e})")))
}

/// Exact comparison of a parsed candidate against the stored key.
pub fn auth_key_matches(stored: i32, candidate: &str) -> Result<bool, AuthError> {
    Ok(parse_auth_key(candidate)? == stored)
}

/// Random positive key for a new or rotated user.
#[must_use]
pub fn generate_auth_key() -> i32 {
    rand::rng().random_range(1..=i32::MAX)
}
