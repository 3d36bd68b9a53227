use std::path::Path;
use std::sync::Arc;

use crate::bars::AssetClass;
use crate::config::HubConfig;
use crate::db::pool::DbPool;
use crate::db::registry::ConnectionRegistry;
use crate::error::HubError;

/// Shared application state, passed to all route handlers via `axum::extract::State`.
pub struct AppState {
    pub config: HubConfig,
    pub registry: ConnectionRegistry,
}

impl AppState {
    pub fn new(config: HubConfig) -> Arc<Self> {
        let registry = ConnectionRegistry::new(config.db_pool_size, config.db_timeout);
        Arc::new(Self { config, registry })
    }

    /// Connection target holding the given asset class.
    pub fn store_path(&self, class: AssetClass) -> &Path {
        match class {
            AssetClass::Stocks => &self.config.stocks_db,
            AssetClass::Options => &self.config.options_db,
        }
    }

    /// Pool for the given asset class, connecting on first use.
    pub fn bar_store(&self, class: AssetClass) -> Result<DbPool, HubError> {
        self.registry.connect(self.store_path(class))
    }

    /// Inclusive year span scanned when building the symbol catalog.
    pub fn catalog_years(&self, class: AssetClass) -> (i32, i32) {
        let first = match class {
            AssetClass::Stocks => self.config.stocks_first_year,
            AssetClass::Options => self.config.options_first_year,
        };
        (first, self.config.catalog_last_year)
    }
}
