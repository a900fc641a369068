//! Argon2id password hashing.

use anyhow::{Context, Result};
use argon2::{
    ARGON2ID_IDENT, Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task;

use crate::config::SecurityConfig;
use crate::services::auth_service::AuthError;

/// Plaintext behind the decoy hash. Never matches a real account.
const DECOY_PASSWORD: &[u8] = b"warden-decoy-password";

#[derive(Debug, Clone)]
pub struct PasswordService {
    params: Params,
    /// Hashed with the configured params so a lookup miss costs a full verify.
    decoy_hash: Arc<str>,
    verifications: Arc<AtomicU64>,
}

impl PasswordService {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        let decoy_hash = hash_with(&argon2id(params.clone()), DECOY_PASSWORD)?;

        Ok(Self {
            params,
            decoy_hash: decoy_hash.into(),
            verifications: Arc::new(AtomicU64::new(0)),
        })
    }

    fn hasher(&self) -> Argon2<'static> {
        argon2id(self.params.clone())
    }

    /// Hashes on the blocking pool; Argon2 would otherwise stall the runtime.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let argon2 = self.hasher();
        let password = password.to_string();

        task::spawn_blocking(move || hash_with(&argon2, password.as_bytes()))
        .await
        .context("Password hashing task panicked")?
    }

    /// `Ok(false)` on mismatch. A stored hash that cannot be parsed or uses an
    /// unknown algorithm is a server-side fault, not a failed login.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        self.verifications.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("password_verifications_total").increment(1);

        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)
                .map_err(|e| AuthError::Configuration(format!("Malformed password hash: {e}")))?;

            match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::Configuration(format!(
                    "Unusable password hash: {e}"
                ))),
            }
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Password verification task panicked: {e}")))?
    }

    /// Runs a full verify against the decoy hash and discards the outcome.
    /// Called when the name lookup misses, so unknown names cost the same as
    /// wrong passwords.
    pub async fn verify_decoy(&self, password: &str) {
        let decoy = Arc::clone(&self.decoy_hash);
        if let Err(e) = self.verify(password, &decoy).await {
            tracing::warn!("Decoy password verification failed: {e}");
        }
    }

    /// Number of verifications run so far, decoys included.
    #[must_use]
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }

    /// True when `stored_hash` was produced with other parameters than the
    /// configured ones.
    #[must_use]
    pub fn needs_rehash(&self, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };

        if parsed.algorithm != ARGON2ID_IDENT {
            return true;
        }

        Params::try_from(&parsed).is_ok_and(|stored| {
            stored.m_cost() != self.params.m_cost()
                || stored.t_cost() != self.params.t_cost()
                || stored.p_cost() != self.params.p_cost()
        })
    }
}

fn argon2id(params: Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

fn hash_with(argon2: &Argon2<'_>, password: &[u8]) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let service = PasswordService::new(&cheap_config()).unwrap();
        let hash = service.hash("correct horse").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("correct horse"));
        assert!(service.verify("correct horse", &hash).await.unwrap());
        assert!(!service.verify("battery staple", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let service = PasswordService::new(&cheap_config()).unwrap();
        let a = service.hash("same").await.unwrap();
        let b = service.hash("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_configuration_error() {
        let service = PasswordService::new(&cheap_config()).unwrap();
        let err = service.verify("anything", "not-a-phc-string").await.unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_needs_rehash_on_param_change() {
        let service = PasswordService::new(&cheap_config()).unwrap();
        let hash = service.hash("pw").await.unwrap();
        assert!(!service.needs_rehash(&hash));

        let stronger = PasswordService::new(&SecurityConfig {
            argon2_memory_cost_kib: 2048,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        })
        .unwrap();
        assert!(stronger.needs_rehash(&hash));
        // Old hashes still verify under new params.
        assert!(stronger.verify("pw", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_decoy_verify_runs_full_argon2() {
        let service = PasswordService::new(&cheap_config()).unwrap();
        assert!(service.decoy_hash.starts_with("$argon2id$"));
        assert!(!service.needs_rehash(&service.decoy_hash));

        service.verify_decoy("whatever").await;
        assert_eq!(service.verifications(), 1);
    }
}
