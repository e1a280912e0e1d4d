//! Record store boundary.
//!
//! `InventoryStore` is the data-access contract consumed by the service layer:
//! keyed CRUD for templates, locations and inventory items, plus the atomic
//! batch insert that allocates positions. Implementations:
//!
//! - [`InMemoryInventoryStore`]: tests/dev.
//! - [`SqliteInventoryStore`]: persistent (sqlx + SQLite).

pub mod in_memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use curator_core::{DomainError, ItemId, LocationId, TemplateId};
use curator_inventory::{
    BatchRequest, InventoryItem, InventoryItemPatch, ItemTemplate, ItemTemplatePatch, Location,
    NewItemTemplate, NewLocation,
};

pub use in_memory::InMemoryInventoryStore;
pub use sqlite::SqliteInventoryStore;

/// Store-level failure.
///
/// Constraint failures from the backing engine are mapped to the specific
/// variants wherever the cause is identifiable; everything else is
/// `Persistence` (or `BatchCreateFailed` inside the batch transaction).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("location name must be unique: {0}")]
    DuplicateName(String),

    #[error("duplicate position, retry: {0}")]
    DuplicatePosition(String),

    #[error("failed to create inventory items: {0}")]
    BatchCreateFailed(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Data-access contract for the inventory core.
///
/// Ordering guarantees: templates and locations list by name ascending,
/// inventory items by position ascending. Deleting a missing id is a no-op;
/// updating one is `NotFound`. No cross-entity validation is performed.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list_item_templates(&self) -> Result<Vec<ItemTemplate>, StoreError>;
    async fn get_item_template(&self, id: TemplateId) -> Result<Option<ItemTemplate>, StoreError>;
    async fn create_item_template(&self, fields: NewItemTemplate) -> Result<ItemTemplate, StoreError>;
    async fn update_item_template(
        &self,
        id: TemplateId,
        patch: &ItemTemplatePatch,
    ) -> Result<ItemTemplate, StoreError>;
    async fn delete_item_template(&self, id: TemplateId) -> Result<(), StoreError>;

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError>;
    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError>;
    async fn create_location(&self, fields: NewLocation) -> Result<Location, StoreError>;
    async fn update_location(&self, id: LocationId, name: &str) -> Result<Location, StoreError>;
    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError>;

    async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>, StoreError>;
    async fn get_inventory_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError>;

    /// Allocate positions and insert one row per requested unit, atomically.
    ///
    /// Either every row is committed with a contiguous run of fresh positions,
    /// or nothing is. Rows are not visible to other readers before commit.
    async fn create_items_batch(&self, request: &BatchRequest) -> Result<Vec<InventoryItem>, StoreError>;

    async fn update_inventory_item(
        &self,
        id: ItemId,
        patch: &InventoryItemPatch,
    ) -> Result<InventoryItem, StoreError>;
    async fn delete_inventory_item(&self, id: ItemId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn list_item_templates(&self) -> Result<Vec<ItemTemplate>, StoreError> {
        (**self).list_item_templates().await
    }

    async fn get_item_template(&self, id: TemplateId) -> Result<Option<ItemTemplate>, StoreError> {
        (**self).get_item_template(id).await
    }

    async fn create_item_template(&self, fields: NewItemTemplate) -> Result<ItemTemplate, StoreError> {
        (**self).create_item_template(fields).await
    }

    async fn update_item_template(
        &self,
        id: TemplateId,
        patch: &ItemTemplatePatch,
    ) -> Result<ItemTemplate, StoreError> {
        (**self).update_item_template(id, patch).await
    }

    async fn delete_item_template(&self, id: TemplateId) -> Result<(), StoreError> {
        (**self).delete_item_template(id).await
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        (**self).list_locations().await
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        (**self).get_location(id).await
    }

    async fn create_location(&self, fields: NewLocation) -> Result<Location, StoreError> {
        (**self).create_location(fields).await
    }

    async fn update_location(&self, id: LocationId, name: &str) -> Result<Location, StoreError> {
        (**self).update_location(id, name).await
    }

    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError> {
        (**self).delete_location(id).await
    }

    async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).list_inventory_items().await
    }

    async fn get_inventory_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        (**self).get_inventory_item(id).await
    }

    async fn create_items_batch(&self, request: &BatchRequest) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).create_items_batch(request).await
    }

    async fn update_inventory_item(
        &self,
        id: ItemId,
        patch: &InventoryItemPatch,
    ) -> Result<InventoryItem, StoreError> {
        (**self).update_inventory_item(id, patch).await
    }

    async fn delete_inventory_item(&self, id: ItemId) -> Result<(), StoreError> {
        (**self).delete_inventory_item(id).await
    }
}
