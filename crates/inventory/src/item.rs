use core::str::FromStr;

use serde::{Deserialize, Serialize};

use curator_core::{DomainError, DomainResult, Entity, ItemId, LocationId, TemplateId};

use crate::allocator::Position;
use crate::text;

/// Condition grade of a physical item.
///
/// Declaration order is the expansion order of a batch: within one batch,
/// `Good` items receive the lowest positions, then `Regular`, then `Bad`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConservationState {
    #[serde(alias = "Bueno")]
    Good,
    Regular,
    #[serde(alias = "Malo")]
    Bad,
}

impl ConservationState {
    /// All states, in batch expansion order.
    pub const ALL: [ConservationState; 3] = [
        ConservationState::Good,
        ConservationState::Regular,
        ConservationState::Bad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConservationState::Good => "Good",
            ConservationState::Regular => "Regular",
            ConservationState::Bad => "Bad",
        }
    }
}

impl core::fmt::Display for ConservationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConservationState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Good" | "Bueno" => Ok(ConservationState::Good),
            "Regular" => Ok(ConservationState::Regular),
            "Bad" | "Malo" => Ok(ConservationState::Bad),
            other => Err(DomainError::validation(format!(
                "unknown conservation state: {other}"
            ))),
        }
    }
}

/// A physical inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: ItemId,
    /// Immutable after creation.
    pub position: Position,
    pub template_id: TemplateId,
    pub location_id: Option<LocationId>,
    pub serial: Option<String>,
    pub situation: Option<String>,
    pub conservation_state: ConservationState,
    pub observations: Option<String>,
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Parse a raw location reference as submitted by a form.
///
/// An empty (or blank) reference means "no location".
pub fn parse_location_ref(raw: &str) -> DomainResult<Option<LocationId>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}

/// Partial update for an inventory item.
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears an optional
/// field. Position is deliberately absent: it never changes after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryItemPatch {
    pub template_id: Option<TemplateId>,
    pub location_id: Option<Option<LocationId>>,
    pub serial: Option<Option<String>>,
    pub situation: Option<Option<String>>,
    pub conservation_state: Option<ConservationState>,
    pub observations: Option<Option<String>>,
}

impl InventoryItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Set the location from raw form input (blank clears it).
    pub fn with_location_input(mut self, raw: &str) -> DomainResult<Self> {
        self.location_id = Some(parse_location_ref(raw)?);
        Ok(self)
    }

    pub fn with_serial(mut self, raw: impl Into<String>) -> Self {
        self.serial = Some(text::optional(Some(raw.into())));
        self
    }

    pub fn with_situation(mut self, raw: impl Into<String>) -> Self {
        self.situation = Some(text::optional(Some(raw.into())));
        self
    }

    pub fn with_observations(mut self, raw: impl Into<String>) -> Self {
        self.observations = Some(text::optional(Some(raw.into())));
        self
    }

    pub fn apply(&self, item: &mut InventoryItem) {
        if let Some(template_id) = self.template_id {
            item.template_id = template_id;
        }
        if let Some(location_id) = self.location_id {
            item.location_id = location_id;
        }
        if let Some(state) = self.conservation_state {
            item.conservation_state = state;
        }
        if let Some(serial) = &self.serial {
            item.serial = text::optional(serial.clone());
        }
        if let Some(situation) = &self.situation {
            item.situation = text::optional(situation.clone());
        }
        if let Some(observations) = &self.observations {
            item.observations = text::optional(observations.clone());
        }
    }

    /// Normalized `(field, value)` pairs for the fields this patch sets.
    /// Ids and states are rendered in their stored text form.
    pub fn changes(&self) -> Vec<(&'static str, Option<String>)> {
        let mut changes = Vec::new();
        if let Some(template_id) = self.template_id {
            changes.push(("template_id", Some(template_id.to_string())));
        }
        if let Some(location_id) = self.location_id {
            changes.push(("location_id", location_id.map(|l| l.to_string())));
        }
        if let Some(serial) = &self.serial {
            changes.push(("serial", text::optional(serial.clone())));
        }
        if let Some(situation) = &self.situation {
            changes.push(("situation", text::optional(situation.clone())));
        }
        if let Some(state) = self.conservation_state {
            changes.push(("conservation_state", Some(state.as_str().to_string())));
        }
        if let Some(observations) = &self.observations {
            changes.push(("observations", text::optional(observations.clone())));
        }
        changes
    }
}

impl InventoryItem {
    pub fn patched(&self, patch: &InventoryItemPatch) -> InventoryItem {
        let mut next = self.clone();
        patch.apply(&mut next);
        next
    }
}
