use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use thiserror::Error;

use crate::entities::{prelude::User as Users, user};

/// User data returned from repository (without the password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub auth_key: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            auth_key: model.auth_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Raised when the storage-level unique constraint on `user.name` rejects an insert.
#[derive(Debug, Error)]
#[error("User name already taken: {0}")]
pub struct DuplicateUserName(pub String);

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user. `password_hash` must already be hashed.
    pub async fn create(&self, name: &str, password_hash: &str, auth_key: i32) -> Result<User> {
        let now = Utc::now();

        let active = user::ActiveModel {
            name: Set(name.to_string()),
            password: Set(password_hash.to_string()),
            auth_key: Set(auth_key),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(User::from(model)),
            Err(err) if is_unique_violation(&err) => {
                Err(DuplicateUserName(name.to_string()).into())
            }
            Err(err) => Err(anyhow::Error::new(err).context("Failed to insert user")),
        }
    }

    /// Get user by name
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self.find_model_by_name(name).await?.map(User::from))
    }

    /// Get user by name together with the stored password hash
    pub async fn get_by_name_with_password(&self, name: &str) -> Result<Option<(User, String)>> {
        Ok(self.find_model_by_name(name).await?.map(|u| {
            let password_hash = u.password.clone();
            (User::from(u), password_hash)
        }))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = Users::find()
            .order_by_asc(user::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    /// Replace the stored password hash
    pub async fn update_password(&self, name: &str, password_hash: &str) -> Result<User> {
        let model = self.require_model_by_name(name).await?;

        let mut active: user::ActiveModel = model.into();
        active.password = Set(password_hash.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.conn).await?;

        Ok(User::from(updated))
    }

    pub async fn update_auth_key(&self, name: &str, auth_key: i32) -> Result<User> {
        let model = self.require_model_by_name(name).await?;

        let mut active: user::ActiveModel = model.into();
        active.auth_key = Set(auth_key);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.conn).await?;

        Ok(User::from(updated))
    }

    /// Returns `false` when no user had that name.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let result = Users::delete_many()
            .filter(user::Column::Name.eq(name))
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }

    async fn find_model_by_name(&self, name: &str) -> Result<Option<user::Model>> {
        Users::find()
            .filter(user::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query user by name")
    }

    async fn require_model_by_name(&self, name: &str) -> Result<user::Model> {
        self.find_model_by_name(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {name}"))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    async fn repo() -> UserRepository {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .expect("in-memory store");
        store.user_repo()
    }

    #[tokio::test]
    async fn test_create_sets_timestamps() {
        let repo = repo().await;
        let user = repo.create("alice", "$argon2id$fake", 42).await.unwrap();

        assert!(user.id > 0);
        assert_eq!(user.name, "alice");
        assert_eq!(user.auth_key, 42);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_by_store() {
        let repo = repo().await;
        repo.create("alice", "hash-a", 1).await.unwrap();

        let err = repo.create("alice", "hash-b", 2).await.unwrap_err();
        assert!(err.downcast_ref::<DuplicateUserName>().is_some());

        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_name_and_id() {
        let repo = repo().await;
        let created = repo.create("bob", "hash", 7).await.unwrap();

        let by_name = repo.get_by_name("bob").await.unwrap().unwrap();
        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_name, by_id);

        assert!(repo.get_by_name("nobody").await.unwrap().is_none());
        assert!(repo.get_by_id(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_with_password_returns_hash() {
        let repo = repo().await;
        repo.create("carol", "stored-hash", 3).await.unwrap();

        let (user, hash) = repo
            .get_by_name_with_password("carol")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.name, "carol");
        assert_eq!(hash, "stored-hash");
    }

    #[tokio::test]
    async fn test_updates_touch_updated_at() {
        let repo = repo().await;
        let created = repo.create("dave", "old", 5).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let updated = repo.update_auth_key("dave", 6).await.unwrap();

        assert_eq!(updated.auth_key, 6);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let updated = repo.update_password("dave", "new").await.unwrap();
        let (_, hash) = repo.get_by_name_with_password("dave").await.unwrap().unwrap();
        assert_eq!(hash, "new");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo().await;
        repo.create("erin", "hash", 9).await.unwrap();

        assert!(repo.delete("erin").await.unwrap());
        assert!(!repo.delete("erin").await.unwrap());
        assert!(repo.get_by_name("erin").await.unwrap().is_none());
    }
}
