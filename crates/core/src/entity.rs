//! Entity trait: identity that survives attribute changes.

use std::collections::HashMap;

/// A record with a stable identifier.
///
/// Templates, locations and inventory items are all plain entities: their
/// attributes change over time, their identifier never does.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}

/// Borrowing lookup table over a slice of entities.
///
/// If two records share an id the later one wins.
pub fn index_by_id<E: Entity>(records: &[E]) -> HashMap<E::Id, &E> {
    records.iter().map(|r| (*r.id(), r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Shelf {
        id: u32,
        label: &'static str,
    }

    impl Entity for Shelf {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[test]
    fn index_resolves_by_id_and_last_duplicate_wins() {
        let shelves = [
            Shelf { id: 1, label: "top" },
            Shelf { id: 2, label: "middle" },
            Shelf { id: 1, label: "replaced" },
        ];
        let index = index_by_id(&shelves);

        assert_eq!(index.len(), 2);
        assert_eq!(index[&2].label, "middle");
        assert_eq!(index[&1].label, "replaced");
        assert!(!index.contains_key(&3));
    }
}
