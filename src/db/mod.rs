use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::user::{DuplicateUserName, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    /// Connects and applies pending migrations.
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let conn = Self::connect(db_url, max_connections, min_connections).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    /// Connects without touching the schema. Used by `warden migrate`.
    pub async fn connect_only(db_url: &str) -> Result<Self> {
        let conn = Self::connect(db_url, 1, 1).await?;
        Ok(Self { conn })
    }

    async fn connect(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<DatabaseConnection> {
        if db_url.starts_with("sqlite:") && !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        Ok(Database::connect(opt).await?)
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    // ========== User Repository Methods ==========

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn create_user(&self, name: &str, password_hash: &str, auth_key: i32) -> Result<User> {
        self.user_repo().create(name, password_hash, auth_key).await
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.user_repo().get_by_name(name).await
    }

    pub async fn get_user_by_name_with_password(
        &self,
        name: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_name_with_password(name).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn update_user_password(&self, name: &str, password_hash: &str) -> Result<User> {
        self.user_repo().update_password(name, password_hash).await
    }

    pub async fn update_user_auth_key(&self, name: &str, auth_key: i32) -> Result<User> {
        self.user_repo().update_auth_key(name, auth_key).await
    }

    pub async fn delete_user(&self, name: &str) -> Result<bool> {
        self.user_repo().delete(name).await
    }
}
