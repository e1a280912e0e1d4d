//! Infrastructure layer: persistence, service wiring, configuration.

pub mod config;
pub mod retry;
pub mod service;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use retry::RetryConfig;
pub use service::{InventoryService, ServiceError, ServiceResult};
pub use store::{InMemoryInventoryStore, InventoryStore, SqliteInventoryStore, StoreError};
