use serde::{Deserialize, Serialize};

use curator_core::{DomainResult, Entity, LocationId};

use crate::text;

/// Named physical place where inventory items may reside.
///
/// Names are globally unique; uniqueness is enforced by the store, which is
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
}

impl NewLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn into_location(self, id: LocationId) -> DomainResult<Location> {
        Ok(Location {
            id,
            name: Location::validate_name(&self.name)?,
        })
    }
}

impl Location {
    /// Normalize a location name, rejecting blank input.
    pub fn validate_name(name: &str) -> DomainResult<String> {
        text::required("name", name)
    }
}
