use axum::http::StatusCode;
use serde::Deserialize;

use curator_core::{LocationId, TemplateId};
use curator_inventory::{
    parse_location_ref, BatchRequest, ConservationState, ExportRow, InventoryItemPatch, NewLocation,
    Quantities, EXPORT_COLUMNS,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    #[serde(default)]
    pub name: String,
}

impl From<CreateLocationRequest> for NewLocation {
    fn from(value: CreateLocationRequest) -> Self {
        NewLocation::new(value.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /inventory/items`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemsBatchRequest {
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub quantities: Quantities,
    #[serde(default)]
    pub situation: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

impl CreateItemsBatchRequest {
    pub fn into_batch(self) -> Result<BatchRequest, axum::response::Response> {
        if self.template_id.trim().is_empty() {
            return Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "templateId is required",
            ));
        }
        let template_id: TemplateId = errors::parse_id(&self.template_id, "template")?;
        let location_id = parse_location(self.location_id.as_deref())?;

        Ok(BatchRequest {
            template_id,
            location_id,
            quantities: self.quantities,
            situation: self.situation,
            observations: self.observations,
        })
    }
}

/// Body of `PATCH /inventory/items/:id`.
///
/// Absent fields are left unchanged. An empty `locationId` clears the
/// location; empty text fields clear the corresponding attribute.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryItemRequest {
    pub template_id: Option<String>,
    pub location_id: Option<String>,
    pub serial: Option<String>,
    pub situation: Option<String>,
    pub conservation_state: Option<ConservationState>,
    pub observations: Option<String>,
}

impl UpdateInventoryItemRequest {
    pub fn into_patch(self) -> Result<InventoryItemPatch, axum::response::Response> {
        let mut patch = InventoryItemPatch {
            conservation_state: self.conservation_state,
            ..InventoryItemPatch::default()
        };

        if let Some(raw) = self.template_id {
            patch.template_id = Some(errors::parse_id(&raw, "template")?);
        }
        if let Some(raw) = self.location_id {
            patch.location_id = Some(parse_location(Some(&raw))?);
        }
        if let Some(serial) = self.serial {
            patch = patch.with_serial(serial);
        }
        if let Some(situation) = self.situation {
            patch = patch.with_situation(situation);
        }
        if let Some(observations) = self.observations {
            patch = patch.with_observations(observations);
        }

        Ok(patch)
    }
}

fn parse_location(raw: Option<&str>) -> Result<Option<LocationId>, axum::response::Response> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_location_ref(raw).map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid location id")
        }),
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn export_to_json(rows: Vec<ExportRow>) -> serde_json::Value {
    serde_json::json!({
        "columns": EXPORT_COLUMNS,
        "generatedAt": chrono::Utc::now().to_rfc3339(),
        "count": rows.len(),
        "rows": rows,
    })
}
