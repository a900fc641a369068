//! JWT issuance and verification.
//!
//! Tokens are HS256-signed, carry the user id as `sub`, and are checked for
//! signature, expiry and issuer. Every verification failure collapses into
//! [`AuthError::Unauthorized`]; the concrete cause is only logged.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{MAX_TOKEN_TTL_SECONDS, SecurityConfig};
use crate::db::User;
use crate::services::auth_service::AuthError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub iss: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Token ID
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &SecurityConfig) -> Result<Self, AuthError> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::Configuration(
                "JWT signing secret is not configured".to_string(),
            ));
        }

        let ttl = Some(config.token_ttl_seconds)
            .filter(|secs| (1..=MAX_TOKEN_TTL_SECONDS).contains(secs))
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "Invalid token lifetime: {}s",
                    config.token_ttl_seconds
                ))
            })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.token_leeway_seconds;
        validation.set_issuer(&[config.token_issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let secret = config.jwt_secret.as_bytes();
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: config.token_issuer.clone(),
            ttl,
        })
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.issue_for(user.id, Utc::now())
    }

    pub fn issue_for(&self, user_id: i32, issued_at: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at.checked_add_signed(self.ttl).ok_or_else(|| {
            AuthError::Configuration("Token expiry is out of range".to_string())
        })?;

        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Configuration(format!("Token creation failed: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the subject user id of a valid token.
    pub fn verify(&self, token: &str) -> Result<i32, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(reason = ?e.kind(), "Rejected bearer token");
            AuthError::Unauthorized
        })?;

        data.claims.sub.parse::<i32>().map_err(|_| {
            debug!(sub = %data.claims.sub, "Rejected bearer token with non-numeric subject");
            AuthError::Unauthorized
        })
    }
}
