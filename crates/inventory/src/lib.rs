//! Inventory domain module.
//!
//! This crate contains business rules for templates, locations and physical
//! inventory items, implemented purely as deterministic domain logic (no IO,
//! no HTTP, no storage). The store layer calls into it to validate input,
//! allocate positions and expand batch requests into rows.

pub mod allocator;
pub mod batch;
pub mod export;
pub mod item;
pub mod location;
pub mod template;

mod text;

pub use allocator::{Position, PositionAllocator};
pub use batch::{BatchRequest, Quantities, DEFAULT_BATCH_UNITS_LIMIT, MAX_BATCH_UNITS};
pub use export::{ExportRow, EXPORT_COLUMNS, MISSING_REFERENCE};
pub use item::{ConservationState, InventoryItem, InventoryItemPatch, parse_location_ref};
pub use location::{Location, NewLocation};
pub use template::{ItemTemplate, ItemTemplatePatch, NewItemTemplate};
