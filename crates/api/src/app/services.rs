//! Service wiring: one store handle, constructed at startup and shared.

use std::sync::Arc;

use curator_infra::{AppConfig, InventoryService, InventoryStore, RetryConfig, SqliteInventoryStore, StoreError};

/// Store handle as seen by the HTTP layer.
pub type SharedStore = Arc<dyn InventoryStore>;

/// Everything route handlers need, passed via `Extension<Arc<AppServices>>`.
#[derive(Clone)]
pub struct AppServices {
    inventory: InventoryService<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, retry: RetryConfig) -> Self {
        Self {
            inventory: InventoryService::new(store).with_retry(retry),
        }
    }

    /// Cap the units a single batch request may create.
    pub fn with_max_batch_units(mut self, max_batch_units: u64) -> Self {
        self.inventory = self.inventory.with_max_batch_units(max_batch_units);
        self
    }

    pub fn inventory(&self) -> &InventoryService<SharedStore> {
        &self.inventory
    }
}

/// Open the SQLite store named by `config` and wire services around it.
///
/// The concrete store is returned alongside so the caller can close the pool
/// on shutdown.
pub async fn build_services(config: &AppConfig) -> Result<(AppServices, SqliteInventoryStore), StoreError> {
    let store = SqliteInventoryStore::connect(&config.database_url, config.max_connections).await?;
    let services = AppServices::new(Arc::new(store.clone()), config.batch_retry.clone())
        .with_max_batch_units(config.max_batch_units);
    Ok((services, store))
}
