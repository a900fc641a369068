//! Domain service for authentication and user management.
//!
//! Handles credential checks, bearer-token resolution and the small set of
//! admin operations (register, password reset, auth-key rotation, removal).

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
///
/// `Unauthorized` carries no detail: a wrong password, an unknown
/// name, an expired token and a forged token all look the same to callers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("User not found")]
    NotFound,

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid auth key: {0}")]
    InvalidAuthKey(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Successful login: the resolved user plus a freshly minted bearer token.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies name + password and issues a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] for an unknown name or a wrong
    /// password, without distinguishing the two.
    async fn login(&self, name: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Decodes a bearer token and loads its subject from the store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] if the token is invalid or its
    /// user no longer exists.
    async fn authenticate_token(&self, token: &str) -> Result<User, AuthError>;

    /// Looks up a user by id.
    async fn find_identity(&self, id: i32) -> Result<Option<User>, AuthError>;

    /// Looks up a user by name.
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, AuthError>;

    /// Resolving an identity straight from an opaque access token is not
    /// offered. Tokens go through [`AuthService::authenticate_token`].
    async fn find_identity_by_access_token(&self, _token: &str) -> Result<User, AuthError> {
        Err(AuthError::Unsupported(
            "find_identity_by_access_token is not supported".to_string(),
        ))
    }

    /// Checks a plaintext password for a named user. Unknown users yield `false`.
    async fn validate_password(&self, name: &str, password: &str) -> Result<bool, AuthError>;

    /// Checks a candidate auth key for a named user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidAuthKey`] if the candidate is not a
    /// base-10 integer and [`AuthError::NotFound`] for an unknown user.
    async fn validate_auth_key(&self, name: &str, candidate: &str) -> Result<bool, AuthError>;

    async fn list_users(&self) -> Result<Vec<User>, AuthError>;

    /// Creates a user with a hashed password and a random auth key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the name is already taken.
    async fn register(&self, name: &str, password: &str) -> Result<User, AuthError>;

    async fn change_password(&self, name: &str, new_password: &str) -> Result<User, AuthError>;

    async fn rotate_auth_key(&self, name: &str) -> Result<User, AuthError>;

    async fn remove_user(&self, name: &str) -> Result<(), AuthError>;
}
