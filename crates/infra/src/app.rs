//! Wiring: one store backend shared by every service.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::StockroomConfig;
use crate::services::{Gatekeeper, InventoryService, Ledger, ServiceResult};
use crate::store::{InMemoryStore, Settings, SettingsStore, SqliteStore, StockStore};

#[derive(Debug)]
pub struct Stockroom<S> {
    pub inventory: InventoryService<S>,
    pub ledger: Ledger<S>,
    pub gate: Gatekeeper<S>,
    store: Arc<S>,
}

impl<S> Stockroom<S>
where
    S: StockStore,
{
    pub fn new(store: Arc<S>, config: &StockroomConfig) -> Self {
        Self {
            inventory: InventoryService::new(store.clone(), config.orphan_policy),
            ledger: Ledger::new(store.clone(), config.default_user.clone()),
            gate: Gatekeeper::new(store.clone(), config.session_ttl()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn settings(&self) -> ServiceResult<Settings> {
        Ok(self.store.load_settings().await?)
    }

    pub async fn set_dark_mode(&self, dark_mode: bool) -> ServiceResult<Settings> {
        let mut settings = self.store.load_settings().await?;
        settings.dark_mode = dark_mode;
        self.store.save_settings(&settings).await?;
        Ok(settings)
    }
}

impl Stockroom<SqliteStore> {
    /// Open the SQLite database named by `config`.
    pub async fn open(config: &StockroomConfig) -> ServiceResult<Self> {
        let store = SqliteStore::connect(&config.database_url).await?;
        info!(database_url = %config.database_url, "stockroom opened");
        Ok(Self::new(Arc::new(store), config))
    }

    /// Load configuration from the environment, install logging and open the
    /// database.
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = StockroomConfig::from_env().context("failed to load stockroom configuration")?;
        config.init_logging();
        Self::open(&config)
            .await
            .with_context(|| format!("failed to open database at {}", config.database_url))
    }
}

impl Stockroom<InMemoryStore> {
    pub fn in_memory(config: &StockroomConfig) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), config)
    }
}
