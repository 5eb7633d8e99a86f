use slotmap::new_key_type;

new_key_type! {
    /// Identifies an entity inside the host database. Keys are assigned by
    /// the database on insert and become meaningless when the host rebuilds
    /// the database (see [`Generation`]).
    pub struct EntityKey;
}

/// Database generation counter. The host bumps this every time it rebuilds
/// the database (network rejoin, save load), invalidating all previously
/// issued [`EntityKey`]s.
pub type Generation = u64;

/// The kind of entity a reference can target. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Prefab,
    Item,
    Station,
    StatusEffect,
    Piece,
    /// Recipes are never the target of a reference token, but they share the
    /// identity-check machinery with every other kind.
    Recipe,
}

/// Handle to a resolution target.
///
/// A reference can resolve either to an entity already present in the host
/// database, or to a declaration still sitting in the pending store. Pending
/// handles are addressed by `(kind, insertion index)` -- the store is
/// append-only, so insertion indices are stable for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityHandle {
    /// Entity present in the host database.
    Db(EntityKey),
    /// Declaration in the pending store, not yet appended to the database.
    Pending { kind: EntityKind, index: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_equality() {
        assert_eq!(EntityKind::Item, EntityKind::Item);
        assert_ne!(EntityKind::Item, EntityKind::Station);
    }

    #[test]
    fn handles_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(
            EntityHandle::Pending {
                kind: EntityKind::Item,
                index: 0,
            },
            "pending",
        );
        assert_eq!(
            map[&EntityHandle::Pending {
                kind: EntityKind::Item,
                index: 0,
            }],
            "pending"
        );
    }
}
