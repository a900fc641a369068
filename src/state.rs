use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, PasswordService, SeaOrmAuthService, TokenService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    /// Wires the services around an already-open store.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let passwords = PasswordService::new(&config.security)?;
        let tokens = TokenService::new(&config.security)?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            passwords,
            tokens,
            config.security.auto_migrate_password_hashes,
        )) as Arc<dyn AuthService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
        })
    }
}
