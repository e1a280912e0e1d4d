//! Batch creation: one submission, many individually numbered items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use curator_core::{DomainError, DomainResult, ItemId, LocationId, TemplateId};

use crate::allocator::PositionAllocator;
use crate::item::{ConservationState, InventoryItem};
use crate::text;

/// Hard ceiling on the units a single batch may create, whatever the
/// configured limit says.
pub const MAX_BATCH_UNITS: u64 = 100_000;

/// Units allowed per batch when nothing else is configured.
pub const DEFAULT_BATCH_UNITS_LIMIT: u64 = 10_000;

/// Requested number of units per conservation state.
///
/// Backed by a `BTreeMap`, so iteration always follows
/// `ConservationState` declaration order (Good, Regular, Bad).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantities(BTreeMap<ConservationState, u32>);

impl Quantities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, state: ConservationState, count: u32) -> Self {
        self.set(state, count);
        self
    }

    pub fn set(&mut self, state: ConservationState, count: u32) {
        self.0.insert(state, count);
    }

    pub fn get(&self, state: ConservationState) -> u32 {
        self.0.get(&state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|&c| u64::from(c)).sum()
    }

    /// Non-zero entries in expansion order.
    pub fn iter(&self) -> impl Iterator<Item = (ConservationState, u32)> + '_ {
        self.0
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(state, count)| (*state, *count))
    }
}

impl FromIterator<(ConservationState, u32)> for Quantities {
    fn from_iter<I: IntoIterator<Item = (ConservationState, u32)>>(iter: I) -> Self {
        let mut q = Quantities::new();
        for (state, count) in iter {
            q.set(state, count);
        }
        q
    }
}

/// A request to create a batch of inventory items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub template_id: TemplateId,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    pub quantities: Quantities,
    #[serde(default)]
    pub situation: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

impl BatchRequest {
    pub fn new(template_id: TemplateId, quantities: Quantities) -> Self {
        Self {
            template_id,
            location_id: None,
            quantities,
            situation: None,
            observations: None,
        }
    }

    pub fn at_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Reject requests that would create nothing or more than
    /// [`MAX_BATCH_UNITS`].
    ///
    /// Must run before any store interaction.
    pub fn validate(&self) -> DomainResult<()> {
        self.validate_within(MAX_BATCH_UNITS)
    }

    /// Like [`validate`](Self::validate), with a tighter unit limit. Limits
    /// above [`MAX_BATCH_UNITS`] are clamped to it.
    pub fn validate_within(&self, limit: u64) -> DomainResult<()> {
        let total = self.quantities.total();
        if total == 0 {
            return Err(DomainError::validation(
                "at least one quantity must be positive",
            ));
        }
        let limit = limit.min(MAX_BATCH_UNITS);
        if total > limit {
            return Err(DomainError::validation(format!(
                "batch of {total} units exceeds the limit of {limit}"
            )));
        }
        Ok(())
    }

    /// Expand the request into rows, drawing positions from `allocator` and
    /// ids from `next_id`.
    ///
    /// Rows come out in position order. Nothing is allocated if the request is
    /// invalid.
    pub fn plan_with(
        &self,
        allocator: &mut PositionAllocator,
        mut next_id: impl FnMut() -> ItemId,
    ) -> DomainResult<Vec<InventoryItem>> {
        self.validate()?;

        let total = self.quantities.total();
        let positions = allocator.allocate(total)?;
        let mut positions = positions.into_iter();

        let situation = text::optional(self.situation.clone());
        let observations = text::optional(self.observations.clone());

        let mut rows = Vec::with_capacity(total as usize);
        for (state, count) in self.quantities.iter() {
            for _ in 0..count {
                let position = positions
                    .next()
                    .ok_or_else(|| DomainError::invariant("allocator returned too few positions"))?;
                rows.push(InventoryItem {
                    id: next_id(),
                    position,
                    template_id: self.template_id,
                    location_id: self.location_id,
                    serial: None,
                    situation: situation.clone(),
                    conservation_state: state,
                    observations: observations.clone(),
                });
            }
        }

        Ok(rows)
    }

    /// Expand the request with freshly generated item ids.
    pub fn plan(&self, allocator: &mut PositionAllocator) -> DomainResult<Vec<InventoryItem>> {
        self.plan_with(allocator, ItemId::new)
    }
}
