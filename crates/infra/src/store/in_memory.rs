use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use curator_core::{ItemId, LocationId, TemplateId};
use curator_inventory::{
    BatchRequest, InventoryItem, InventoryItemPatch, ItemTemplate, ItemTemplatePatch, Location,
    NewItemTemplate, NewLocation, Position, PositionAllocator,
};

use super::{InventoryStore, StoreError};

#[derive(Debug, Default)]
struct State {
    templates: HashMap<TemplateId, ItemTemplate>,
    locations: HashMap<LocationId, Location>,
    items: HashMap<ItemId, InventoryItem>,
    /// Unique index on position.
    positions: BTreeMap<Position, ItemId>,
    /// Largest position ever allocated (survives deletes).
    high_water: Position,
}

impl State {
    fn name_taken(&self, name: &str, except: Option<LocationId>) -> bool {
        self.locations
            .values()
            .any(|l| l.name == name && Some(l.id) != except)
    }

    /// Insert a planned batch, all-or-nothing.
    ///
    /// Mirrors the unique index on `inventory_items.position`: if any planned
    /// position is already taken, nothing is inserted.
    fn insert_rows(&mut self, rows: &[InventoryItem]) -> Result<(), StoreError> {
        if let Some(taken) = rows.iter().find(|r| self.positions.contains_key(&r.position)) {
            return Err(StoreError::DuplicatePosition(format!(
                "position {} already exists",
                taken.position
            )));
        }

        for row in rows {
            self.positions.insert(row.position, row.id);
            self.items.insert(row.id, row.clone());
        }
        if let Some(last) = rows.iter().map(|r| r.position).max() {
            self.high_water = self.high_water.max(last);
        }
        Ok(())
    }
}

/// In-memory record store.
///
/// Intended for tests/dev. A single `RwLock` over all tables gives the batch
/// insert the same read-max-then-insert isolation the SQLite store gets from
/// its write transaction.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Persistence("store lock poisoned".to_string()))?;
        Ok(f(&state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Persistence("store lock poisoned".to_string()))?;
        f(&mut state)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn list_item_templates(&self) -> Result<Vec<ItemTemplate>, StoreError> {
        self.read(|s| {
            let mut out: Vec<_> = s.templates.values().cloned().collect();
            out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            out
        })
    }

    async fn get_item_template(&self, id: TemplateId) -> Result<Option<ItemTemplate>, StoreError> {
        self.read(|s| s.templates.get(&id).cloned())
    }

    async fn create_item_template(&self, fields: NewItemTemplate) -> Result<ItemTemplate, StoreError> {
        let template = fields.into_template(TemplateId::new())?;
        self.write(|s| {
            s.templates.insert(template.id, template.clone());
            Ok(template)
        })
    }

    async fn update_item_template(
        &self,
        id: TemplateId,
        patch: &ItemTemplatePatch,
    ) -> Result<ItemTemplate, StoreError> {
        self.write(|s| {
            let current = s.templates.get_mut(&id).ok_or(StoreError::NotFound)?;
            let next = current.patched(patch)?;
            *current = next.clone();
            Ok(next)
        })
    }

    async fn delete_item_template(&self, id: TemplateId) -> Result<(), StoreError> {
        self.write(|s| {
            s.templates.remove(&id);
            Ok(())
        })
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        self.read(|s| {
            let mut out: Vec<_> = s.locations.values().cloned().collect();
            out.sort_by(|a, b| a.name.cmp(&b.name));
            out
        })
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        self.read(|s| s.locations.get(&id).cloned())
    }

    async fn create_location(&self, fields: NewLocation) -> Result<Location, StoreError> {
        let location = fields.into_location(LocationId::new())?;
        self.write(|s| {
            if s.name_taken(&location.name, None) {
                return Err(StoreError::DuplicateName(location.name.clone()));
            }
            s.locations.insert(location.id, location.clone());
            Ok(location)
        })
    }

    async fn update_location(&self, id: LocationId, name: &str) -> Result<Location, StoreError> {
        let name = Location::validate_name(name)?;
        self.write(|s| {
            if !s.locations.contains_key(&id) {
                return Err(StoreError::NotFound);
            }
            if s.name_taken(&name, Some(id)) {
                return Err(StoreError::DuplicateName(name));
            }
            let location = Location { id, name };
            s.locations.insert(id, location.clone());
            Ok(location)
        })
    }

    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError> {
        self.write(|s| {
            s.locations.remove(&id);
            Ok(())
        })
    }

    async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        self.read(|s| {
            s.positions
                .values()
                .filter_map(|id| s.items.get(id).cloned())
                .collect()
        })
    }

    async fn get_inventory_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        self.read(|s| s.items.get(&id).cloned())
    }

    async fn create_items_batch(&self, request: &BatchRequest) -> Result<Vec<InventoryItem>, StoreError> {
        request.validate()?;
        self.write(|s| {
            let in_use = s.positions.keys().next_back().copied().unwrap_or(Position::ZERO);
            let mut allocator = PositionAllocator::starting_after(s.high_water.max(in_use));
            let rows = request.plan(&mut allocator)?;
            s.insert_rows(&rows)?;
            Ok(rows)
        })
    }

    async fn update_inventory_item(
        &self,
        id: ItemId,
        patch: &InventoryItemPatch,
    ) -> Result<InventoryItem, StoreError> {
        self.write(|s| {
            let current = s.items.get_mut(&id).ok_or(StoreError::NotFound)?;
            patch.apply(current);
            Ok(current.clone())
        })
    }

    async fn delete_inventory_item(&self, id: ItemId) -> Result<(), StoreError> {
        self.write(|s| {
            if let Some(item) = s.items.remove(&id) {
                s.positions.remove(&item.position);
            }
            Ok(())
        })
    }
}
