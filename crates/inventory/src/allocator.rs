//! Sequential position allocation.
//!
//! Positions are handed out strictly above the store's high-water mark: the
//! largest position ever allocated. Freed positions (deleted items) stay below
//! the mark and are never handed out again.

use serde::{Deserialize, Serialize};

use curator_core::{DomainError, DomainResult};

/// Ordinal of a physical item in the overall count. Starts at 1; the default
/// (zero) means "nothing allocated yet".
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(i64);

impl Position {
    /// Sentinel for "nothing allocated yet".
    pub const ZERO: Position = Position(0);

    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 0 {
            return Err(DomainError::invariant("position cannot be negative"));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Hands out consecutive positions above a starting high-water mark.
///
/// An allocator is meant to live for the duration of a single write
/// transaction: the caller reads the mark, allocates, inserts and persists
/// `last()` as the new mark before committing.
#[derive(Debug, Clone)]
pub struct PositionAllocator {
    last: Position,
}

impl PositionAllocator {
    pub fn starting_after(high_water: Position) -> Self {
        Self { last: high_water }
    }

    /// The most recently allocated position (or the starting mark).
    pub fn last(&self) -> Position {
        self.last
    }

    pub fn next_position(&mut self) -> DomainResult<Position> {
        let next = self
            .last
            .0
            .checked_add(1)
            .ok_or_else(|| DomainError::invariant("position space exhausted"))?;
        self.last = Position(next);
        Ok(self.last)
    }

    /// Allocate `count` consecutive positions. `count` must be at least 1.
    pub fn allocate(&mut self, count: u64) -> DomainResult<Vec<Position>> {
        if count == 0 {
            return Err(DomainError::validation(
                "at least one quantity must be positive",
            ));
        }
        let count_i64 = i64::try_from(count)
            .map_err(|_| DomainError::invariant("position space exhausted"))?;
        if self.last.0.checked_add(count_i64).is_none() {
            return Err(DomainError::invariant("position space exhausted"));
        }

        (0..count).map(|_| self.next_position()).collect()
    }
}
