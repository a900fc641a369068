//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::db::{DuplicateUserName, Store, User};
use crate::services::auth_key::{auth_key_matches, generate_auth_key};
use crate::services::auth_service::{AuthError, AuthService, LoginResult};
use crate::services::password::PasswordService;
use crate::services::token::TokenService;

const MAX_NAME_LEN: usize = 191;
const MIN_PASSWORD_LEN: usize = 8;

pub struct SeaOrmAuthService {
    store: Store,
    passwords: PasswordService,
    tokens: TokenService,
    auto_migrate_hashes: bool,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        passwords: PasswordService,
        tokens: TokenService,
        auto_migrate_hashes: bool,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
            auto_migrate_hashes,
        }
    }

    async fn migrate_hash(&self, name: &str, password: &str) -> anyhow::Result<()> {
        let new_hash = self.passwords.hash(password).await?;
        self.store.update_user_password(name, &new_hash).await?;
        info!(user = %name, "Password hash migrated to current Argon2 params");
        Ok(())
    }

    async fn require_user(&self, name: &str) -> Result<User, AuthError> {
        self.store
            .get_user_by_name(name)
            .await?
            .ok_or(AuthError::NotFound)
    }
}

fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AuthError::Validation(format!(
            "Name must be {MAX_NAME_LEN} characters or less"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AuthError::Validation(
            "Name cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, name: &str, password: &str) -> Result<LoginResult, AuthError> {
        let Some((user, stored_hash)) = self.store.get_user_by_name_with_password(name).await?
        else {
            self.passwords.verify_decoy(password).await;
            return Err(AuthError::Unauthorized);
        };

        if !self.passwords.verify(password, &stored_hash).await? {
            return Err(AuthError::Unauthorized);
        }

        if self.auto_migrate_hashes
            && self.passwords.needs_rehash(&stored_hash)
            && let Err(e) = self.migrate_hash(name, password).await
        {
            warn!(user = %name, "Failed to migrate password hash: {e}");
        }

        let issued = self.tokens.issue(&user)?;

        Ok(LoginResult {
            user,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    async fn authenticate_token(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self.tokens.verify(token)?;

        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    async fn find_identity(&self, id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_id(id).await?)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_name(name).await?)
    }

    async fn validate_password(&self, name: &str, password: &str) -> Result<bool, AuthError> {
        match self.store.get_user_by_name_with_password(name).await? {
            Some((_, stored_hash)) => self.passwords.verify(password, &stored_hash).await,
            None => {
                self.passwords.verify_decoy(password).await;
                Ok(false)
            }
        }
    }

    async fn validate_auth_key(&self, name: &str, candidate: &str) -> Result<bool, AuthError> {
        let user = self.require_user(name).await?;
        auth_key_matches(user.auth_key, candidate)
    }

    async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_users().await?)
    }

    async fn register(&self, name: &str, password: &str) -> Result<User, AuthError> {
        validate_name(name)?;
        validate_new_password(password)?;

        let password_hash = self.passwords.hash(password).await?;

        let user = self
            .store
            .create_user(name, &password_hash, generate_auth_key())
            .await
            .map_err(|e| match e.downcast_ref::<DuplicateUserName>() {
                Some(dup) => AuthError::Conflict(dup.to_string()),
                None => AuthError::from(e),
            })?;

        info!(user = %user.name, id = user.id, "User registered");
        Ok(user)
    }

    async fn change_password(&self, name: &str, new_password: &str) -> Result<User, AuthError> {
        validate_new_password(new_password)?;
        self.require_user(name).await?;

        let password_hash = self.passwords.hash(new_password).await?;
        let user = self.store.update_user_password(name, &password_hash).await?;

        info!(user = %name, "Password changed");
        Ok(user)
    }

    async fn rotate_auth_key(&self, name: &str) -> Result<User, AuthError> {
        self.require_user(name).await?;

        let user = self
            .store
            .update_user_auth_key(name, generate_auth_key())
            .await?;

        info!(user = %name, "Auth key rotated");
        Ok(user)
    }

    async fn remove_user(&self, name: &str) -> Result<(), AuthError> {
        if !self.store.delete_user(name).await? {
            return Err(AuthError::NotFound);
        }

        info!(user = %name, "User removed");
        Ok(())
    }
}
