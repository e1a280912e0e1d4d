//! Flat, read-only projection of the inventory for spreadsheet export.
//!
//! Items whose template or location has been deleted still export; the
//! missing reference renders as [`MISSING_REFERENCE`].

use serde::Serialize;

use curator_core::index_by_id;

use crate::item::InventoryItem;
use crate::location::Location;
use crate::template::ItemTemplate;

/// Placeholder for a dangling template/location reference.
pub const MISSING_REFERENCE: &str = "N/A";

/// Column headers, in export order.
pub const EXPORT_COLUMNS: [&str; 10] = [
    "Position",
    "Asset Code",
    "Item Name",
    "Brand",
    "Model",
    "Location",
    "Serial Number",
    "Situation",
    "Conservation State",
    "Observations",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Position")]
    pub position: i64,
    #[serde(rename = "Asset Code")]
    pub asset_code: String,
    #[serde(rename = "Item Name")]
    pub item_name: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Serial Number")]
    pub serial_number: String,
    #[serde(rename = "Situation")]
    pub situation: String,
    #[serde(rename = "Conservation State")]
    pub conservation_state: String,
    #[serde(rename = "Observations")]
    pub observations: String,
}

impl ExportRow {
    /// Cell values in [`EXPORT_COLUMNS`] order.
    pub fn cells(&self) -> [String; 10] {
        [
            self.position.to_string(),
            self.asset_code.clone(),
            self.item_name.clone(),
            self.brand.clone(),
            self.model.clone(),
            self.location.clone(),
            self.serial_number.clone(),
            self.situation.clone(),
            self.conservation_state.clone(),
            self.observations.clone(),
        ]
    }
}

/// Join items with their template and location. Output follows the order of
/// `items` (callers pass them sorted by position).
pub fn project(
    items: &[InventoryItem],
    templates: &[ItemTemplate],
    locations: &[Location],
) -> Vec<ExportRow> {
    let templates = index_by_id(templates);
    let locations = index_by_id(locations);

    items
        .iter()
        .map(|item| {
            let template = templates.get(&item.template_id).copied();
            let location = item.location_id.and_then(|id| locations.get(&id).copied());

            ExportRow {
                position: item.position.value(),
                asset_code: template
                    .map(|t| t.asset_code.clone())
                    .unwrap_or_else(|| MISSING_REFERENCE.to_string()),
                item_name: template
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| MISSING_REFERENCE.to_string()),
                brand: template.and_then(|t| t.brand.clone()).unwrap_or_default(),
                model: template.and_then(|t| t.model.clone()).unwrap_or_default(),
                location: location
                    .map(|l| l.name.clone())
                    .unwrap_or_else(|| MISSING_REFERENCE.to_string()),
                serial_number: item.serial.clone().unwrap_or_default(),
                situation: item.situation.clone().unwrap_or_default(),
                conservation_state: item.conservation_state.to_string(),
                observations: item.observations.clone().unwrap_or_default(),
            }
        })
        .collect()
}
