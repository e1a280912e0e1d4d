//! Inventory service: the operation surface consumed by the HTTP layer.
//!
//! Wraps an [`InventoryStore`] and adds what the store does not do itself:
//!
//! - input validation before any store call
//! - translation of store failures into one [`ServiceError`] taxonomy
//! - bounded retry of batch creation when it loses a position race
//! - the flat export projection

use curator_core::{DomainError, ItemId, LocationId, TemplateId};
use curator_inventory::{
    export, BatchRequest, ExportRow, DEFAULT_BATCH_UNITS_LIMIT, InventoryItem, InventoryItemPatch, ItemTemplate,
    ItemTemplatePatch, Location, NewItemTemplate, NewLocation,
};
use thiserror::Error;
use tracing::{info, instrument};

use crate::retry::{with_retry, RetryConfig};
use crate::store::{InventoryStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Input rejected before reaching the store.
    #[error("{0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("location name must be unique: {0}")]
    DuplicateName(String),

    /// Position conflict that persisted through every retry.
    #[error("duplicate position, retry: {0}")]
    DuplicatePosition(String),

    #[error("failed to create inventory items: {0}")]
    BatchCreateFailed(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::InvariantViolation(msg) => ServiceError::Persistence(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::DuplicateName(msg) => ServiceError::DuplicateName(msg),
            StoreError::DuplicatePosition(msg) => ServiceError::DuplicatePosition(msg),
            StoreError::BatchCreateFailed(msg) => ServiceError::BatchCreateFailed(msg),
            StoreError::Persistence(msg) => ServiceError::Persistence(msg),
            StoreError::Domain(err) => err.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Inventory operations over any [`InventoryStore`].
///
/// The HTTP layer holds an `InventoryService<Arc<dyn InventoryStore>>`; tests
/// use concrete stores directly.
#[derive(Debug, Clone)]
pub struct InventoryService<S> {
    store: S,
    retry: RetryConfig,
    max_batch_units: u64,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry: RetryConfig::default(),
            max_batch_units: DEFAULT_BATCH_UNITS_LIMIT,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Cap the units a single batch may create.
    pub fn with_max_batch_units(mut self, max_batch_units: u64) -> Self {
        self.max_batch_units = max_batch_units;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- templates ----

    pub async fn list_item_templates(&self) -> ServiceResult<Vec<ItemTemplate>> {
        Ok(self.store.list_item_templates().await?)
    }

    pub async fn get_item_template(&self, id: TemplateId) -> ServiceResult<ItemTemplate> {
        self.store
            .get_item_template(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn create_item_template(&self, fields: NewItemTemplate) -> ServiceResult<ItemTemplate> {
        fields.validate()?;
        Ok(self.store.create_item_template(fields).await?)
    }

    pub async fn update_item_template(
        &self,
        id: TemplateId,
        patch: &ItemTemplatePatch,
    ) -> ServiceResult<ItemTemplate> {
        patch.validate()?;
        Ok(self.store.update_item_template(id, patch).await?)
    }

    pub async fn delete_item_template(&self, id: TemplateId) -> ServiceResult<()> {
        Ok(self.store.delete_item_template(id).await?)
    }

    // ---- locations ----

    pub async fn list_locations(&self) -> ServiceResult<Vec<Location>> {
        Ok(self.store.list_locations().await?)
    }

    pub async fn get_location(&self, id: LocationId) -> ServiceResult<Location> {
        self.store.get_location(id).await?.ok_or(ServiceError::NotFound)
    }

    pub async fn create_location(&self, fields: NewLocation) -> ServiceResult<Location> {
        Location::validate_name(&fields.name)?;
        Ok(self.store.create_location(fields).await?)
    }

    pub async fn update_location(&self, id: LocationId, name: &str) -> ServiceResult<Location> {
        Location::validate_name(name)?;
        Ok(self.store.update_location(id, name).await?)
    }

    pub async fn delete_location(&self, id: LocationId) -> ServiceResult<()> {
        Ok(self.store.delete_location(id).await?)
    }

    // ---- inventory items ----

    pub async fn list_inventory_items(&self) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.store.list_inventory_items().await?)
    }

    pub async fn get_inventory_item(&self, id: ItemId) -> ServiceResult<InventoryItem> {
        self.store
            .get_inventory_item(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Create one item per requested unit, atomically.
    ///
    /// A lost position race (`DuplicatePosition`) is retried with backoff;
    /// every attempt re-reads the high-water mark inside a fresh transaction.
    #[instrument(
        skip(self, request),
        fields(template_id = %request.template_id, units = request.quantities.total())
    )]
    pub async fn create_inventory_items_batch(
        &self,
        request: &BatchRequest,
    ) -> ServiceResult<Vec<InventoryItem>> {
        request.validate_within(self.max_batch_units)?;

        let created = with_retry(
            &self.retry,
            |err: &StoreError| matches!(err, StoreError::DuplicatePosition(_)),
            || self.store.create_items_batch(request),
        )
        .await?;

        info!(count = created.len(), "inventory batch created");
        Ok(created)
    }

    pub async fn update_inventory_item(
        &self,
        id: ItemId,
        patch: &InventoryItemPatch,
    ) -> ServiceResult<InventoryItem> {
        Ok(self.store.update_inventory_item(id, patch).await?)
    }

    pub async fn delete_inventory_item(&self, id: ItemId) -> ServiceResult<()> {
        Ok(self.store.delete_inventory_item(id).await?)
    }

    // ---- export ----

    /// Flat rows for spreadsheet export, ordered by position.
    pub async fn export_inventory(&self) -> ServiceResult<Vec<ExportRow>> {
        let items = self.store.list_inventory_items().await?;
        let templates = self.store.list_item_templates().await?;
        let locations = self.store.list_locations().await?;
        Ok(export::project(&items, &templates, &locations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use curator_inventory::{ConservationState, Quantities, MISSING_REFERENCE};

    use crate::store::InMemoryInventoryStore;

    /// Store wrapper that fails the first `conflicts` batch calls with a
    /// position conflict, and counts how many batch calls it saw.
    struct ConflictingStore {
        inner: InMemoryInventoryStore,
        conflicts: AtomicU32,
        batch_calls: AtomicU32,
    }

    impl ConflictingStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: InMemoryInventoryStore::new(),
                conflicts: AtomicU32::new(conflicts),
                batch_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl InventoryStore for ConflictingStore {
        async fn list_item_templates(&self) -> Result<Vec<ItemTemplate>, StoreError> {
            self.inner.list_item_templates().await
        }
        async fn get_item_template(&self, id: TemplateId) -> Result<Option<ItemTemplate>, StoreError> {
            self.inner.get_item_template(id).await
        }
        async fn create_item_template(&self, fields: NewItemTemplate) -> Result<ItemTemplate, StoreError> {
            self.inner.create_item_template(fields).await
        }
        async fn update_item_template(
            &self,
            id: TemplateId,
            patch: &ItemTemplatePatch,
        ) -> Result<ItemTemplate, StoreError> {
            self.inner.update_item_template(id, patch).await
        }
        async fn delete_item_template(&self, id: TemplateId) -> Result<(), StoreError> {
            self.inner.delete_item_template(id).await
        }
        async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
            self.inner.list_locations().await
        }
        async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
            self.inner.get_location(id).await
        }
        async fn create_location(&self, fields: NewLocation) -> Result<Location, StoreError> {
            self.inner.create_location(fields).await
        }
        async fn update_location(&self, id: LocationId, name: &str) -> Result<Location, StoreError> {
            self.inner.update_location(id, name).await
        }
        async fn delete_location(&self, id: LocationId) -> Result<(), StoreError> {
            self.inner.delete_location(id).await
        }
        async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
            self.inner.list_inventory_items().await
        }
        async fn get_inventory_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
            self.inner.get_inventory_item(id).await
        }
        async fn create_items_batch(&self, request: &BatchRequest) -> Result<Vec<InventoryItem>, StoreError> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::DuplicatePosition("position 1 already exists".into()));
            }
            self.inner.create_items_batch(request).await
        }
        async fn update_inventory_item(
            &self,
            id: ItemId,
            patch: &InventoryItemPatch,
        ) -> Result<InventoryItem, StoreError> {
            self.inner.update_inventory_item(id, patch).await
        }
        async fn delete_inventory_item(&self, id: ItemId) -> Result<(), StoreError> {
            self.inner.delete_inventory_item(id).await
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 2.0,
        }
    }

    fn good(n: u32) -> Quantities {
        Quantities::new().with(ConservationState::Good, n)
    }

    #[tokio::test]
    async fn batch_retries_position_conflicts() {
        let service = InventoryService::new(ConflictingStore::new(2)).with_retry(fast_retry(3));
        let t = service
            .create_item_template(NewItemTemplate::new("A1", "Chair"))
            .await
            .unwrap();

        let created = service
            .create_inventory_items_batch(&BatchRequest::new(t.id, good(2)))
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(service.store().batch_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn batch_surfaces_conflict_after_last_attempt() {
        let service = InventoryService::new(ConflictingStore::new(5)).with_retry(fast_retry(2));
        let t = service
            .create_item_template(NewItemTemplate::new("A1", "Chair"))
            .await
            .unwrap();

        let err = service
            .create_inventory_items_batch(&BatchRequest::new(t.id, good(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::DuplicatePosition(_)));
        assert!(err.to_string().contains("retry"));
        assert!(service.list_inventory_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_zero_batch_never_reaches_store() {
        let service = InventoryService::new(ConflictingStore::new(0));
        let q = Quantities::new()
            .with(ConservationState::Good, 0)
            .with(ConservationState::Regular, 0)
            .with(ConservationState::Bad, 0);

        let err = service
            .create_inventory_items_batch(&BatchRequest::new(TemplateId::new(), q))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::Validation("at least one quantity must be positive".to_string())
        );
        assert_eq!(service.store().batch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_over_unit_limit_never_reaches_store() {
        let service = InventoryService::new(ConflictingStore::new(0)).with_max_batch_units(5);
        let t = service
            .create_item_template(NewItemTemplate::new("A1", "Chair"))
            .await
            .unwrap();

        let err = service
            .create_inventory_items_batch(&BatchRequest::new(t.id, good(6)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Validation("batch of 6 units exceeds the limit of 5".to_string())
        );
        assert_eq!(service.store().batch_calls.load(Ordering::SeqCst), 0);

        let created = service
            .create_inventory_items_batch(&BatchRequest::new(t.id, good(5)))
            .await
            .unwrap();
        assert_eq!(created.len(), 5);
    }

    #[tokio::test]
    async fn blank_required_fields_are_validation_errors() {
        let service = InventoryService::new(InMemoryInventoryStore::new());

        let err = service
            .create_item_template(NewItemTemplate::new("  ", "Chair"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service.create_location(NewLocation::new("")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(service.list_locations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_errors_map_onto_service_taxonomy() {
        let service = InventoryService::new(InMemoryInventoryStore::new());
        service.create_location(NewLocation::new("Warehouse")).await.unwrap();

        assert!(matches!(
            service.create_location(NewLocation::new("Warehouse")).await,
            Err(ServiceError::DuplicateName(_))
        ));
        assert_eq!(
            service.get_inventory_item(ItemId::new()).await.unwrap_err(),
            ServiceError::NotFound
        );
        assert_eq!(
            service.update_location(LocationId::new(), "Annex").await.unwrap_err(),
            ServiceError::NotFound
        );
    }

    #[tokio::test]
    async fn export_renders_dangling_references() {
        let service = InventoryService::new(Arc::new(InMemoryInventoryStore::new()));
        let t = service
            .create_item_template(NewItemTemplate::new("A1", "Chair"))
            .await
            .unwrap();
        let l = service.create_location(NewLocation::new("Warehouse")).await.unwrap();
        service
            .create_inventory_items_batch(&BatchRequest::new(t.id, good(2)).at_location(l.id))
            .await
            .unwrap();

        service.delete_location(l.id).await.unwrap();
        let rows = service.export_inventory().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].item_name, "Chair");
        assert_eq!(rows[0].location, MISSING_REFERENCE);
        assert_eq!(rows[1].position, 2);
    }
}
