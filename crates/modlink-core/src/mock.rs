//! Reference tokens ("mocks") standing in for entities that may not exist yet.
//!
//! Extensions declare cross-references by name: a recipe names its crafting
//! station, an item names its drop prefab. A [`MockRef`] records that name
//! together with the kind of entity it must resolve to, and is patched into a
//! real [`EntityHandle`] by the resolver during a lifecycle cycle.
//!
//! # Resolution contract
//!
//! The `resolved` slot is write-once *per database generation*:
//!
//! - unresolved tokens accept any successful lookup result;
//! - re-resolving with an identical result is a no-op;
//! - a `Pending` handle upgrades silently to a `Db` handle within the same
//!   generation (the pending declaration became that database entity);
//! - any other divergence in the same generation is a [`MockError::Conflict`]
//!   and the slot keeps its original value;
//! - a new generation overwrites unconditionally, because the host rebuilt
//!   its database and every old key is dead.

use crate::id::{EntityHandle, EntityKind, Generation};
use std::hash::{Hash, Hasher};

/// A resolution context: something that can find an entity by kind and name.
///
/// Implemented by the host database index and by the resolver's per-pass
/// lookup chain.
pub trait EntityLookup {
    fn find(&self, kind: EntityKind, name: &str) -> Option<EntityHandle>;
}

/// Errors surfaced by token resolution. Both are data errors: the resolver
/// reports them and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MockError {
    #[error("no {kind:?} named {name:?} in the host database or pending declarations")]
    NotFound { kind: EntityKind, name: String },
    #[error("reference {name:?} already resolved to a different entity (kept {kept:?}, rejected {rejected:?})")]
    Conflict {
        name: String,
        kept: EntityHandle,
        rejected: EntityHandle,
    },
}

/// A named placeholder for an entity of a given kind.
///
/// Tokens are structurally equal by `(kind, name)` so they can be reused and
/// cached freely; the `resolved` slot does not participate in equality.
#[derive(Debug, Clone)]
pub struct MockRef {
    kind: EntityKind,
    name: String,
    resolved: Option<(Generation, EntityHandle)>,
}

impl PartialEq for MockRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for MockRef {}

impl Hash for MockRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

impl MockRef {
    /// Create an unresolved token. Never touches the host database.
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            resolved: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// The handle this token resolved to in the given generation, if any.
    /// Handles from older generations are stale and reported as `None`.
    pub fn handle_for(&self, generation: Generation) -> Option<EntityHandle> {
        match self.resolved {
            Some((g, handle)) if g == generation => Some(handle),
            _ => None,
        }
    }

    /// Resolve this token against a lookup context, storing the result in the
    /// slot per the write-once-per-generation contract described in the
    /// module docs.
    pub fn resolve(
        &mut self,
        generation: Generation,
        lookup: &dyn EntityLookup,
    ) -> Result<EntityHandle, MockError> {
        let found = lookup
            .find(self.kind, &self.name)
            .ok_or_else(|| MockError::NotFound {
                kind: self.kind,
                name: self.name.clone(),
            })?;

        match self.resolved {
            None => {
                self.resolved = Some((generation, found));
                Ok(found)
            }
            Some((g, _)) if g != generation => {
                // The database was rebuilt; the old handle is dead.
                self.resolved = Some((generation, found));
                Ok(found)
            }
            Some((_, prev)) if prev == found => Ok(found),
            Some((_, EntityHandle::Pending { .. })) if matches!(found, EntityHandle::Db(_)) => {
                // The pending declaration was appended this cycle.
                self.resolved = Some((generation, found));
                Ok(found)
            }
            Some((_, prev)) => Err(MockError::Conflict {
                name: self.name.clone(),
                kept: prev,
                rejected: found,
            }),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityKey;
    use slotmap::SlotMap;
    use std::collections::HashMap;

    fn make_keys(n: usize) -> Vec<EntityKey> {
        let mut sm = SlotMap::<EntityKey, ()>::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    /// Minimal lookup backed by a map.
    struct MapLookup(HashMap<(EntityKind, String), EntityHandle>);

    impl MapLookup {
        fn with(entries: &[(EntityKind, &str, EntityHandle)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(k, n, h)| ((*k, n.to_string()), *h))
                    .collect(),
            )
        }
    }

    impl EntityLookup for MapLookup {
        fn find(&self, kind: EntityKind, name: &str) -> Option<EntityHandle> {
            self.0.get(&(kind, name.to_string())).copied()
        }
    }

    #[test]
    fn tokens_equal_by_kind_and_name() {
        let a = MockRef::new(EntityKind::Item, "sword");
        let b = MockRef::new(EntityKind::Item, "sword");
        let c = MockRef::new(EntityKind::Station, "sword");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, MockRef::new(EntityKind::Item, "axe"));
    }

    #[test]
    fn construction_leaves_slot_empty() {
        let token = MockRef::new(EntityKind::Item, "sword");
        assert!(!token.is_resolved());
        assert_eq!(token.handle_for(0), None);
    }

    #[test]
    fn resolve_stores_handle() {
        let keys = make_keys(1);
        let lookup = MapLookup::with(&[(EntityKind::Item, "sword", EntityHandle::Db(keys[0]))]);
        let mut token = MockRef::new(EntityKind::Item, "sword");

        let handle = token.resolve(1, &lookup).unwrap();
        assert_eq!(handle, EntityHandle::Db(keys[0]));
        assert_eq!(token.handle_for(1), Some(EntityHandle::Db(keys[0])));
    }

    #[test]
    fn resolve_missing_name_fails() {
        let lookup = MapLookup::with(&[]);
        let mut token = MockRef::new(EntityKind::Item, "sword");

        let err = token.resolve(1, &lookup).unwrap_err();
        assert_eq!(
            err,
            MockError::NotFound {
                kind: EntityKind::Item,
                name: "sword".to_string(),
            }
        );
        assert!(!token.is_resolved());
    }

    #[test]
    fn re_resolve_identical_is_noop() {
        let keys = make_keys(1);
        let lookup = MapLookup::with(&[(EntityKind::Item, "sword", EntityHandle::Db(keys[0]))]);
        let mut token = MockRef::new(EntityKind::Item, "sword");

        token.resolve(1, &lookup).unwrap();
        let again = token.resolve(1, &lookup).unwrap();
        assert_eq!(again, EntityHandle::Db(keys[0]));
    }

    #[test]
    fn conflicting_resolution_keeps_original() {
        let keys = make_keys(2);
        let mut token = MockRef::new(EntityKind::Item, "sword");

        let first = MapLookup::with(&[(EntityKind::Item, "sword", EntityHandle::Db(keys[0]))]);
        token.resolve(1, &first).unwrap();

        // Same generation, different entity behind the name.
        let second = MapLookup::with(&[(EntityKind::Item, "sword", EntityHandle::Db(keys[1]))]);
        let err = token.resolve(1, &second).unwrap_err();
        assert!(matches!(err, MockError::Conflict { .. }));

        // Slot keeps the first resolution.
        assert_eq!(token.handle_for(1), Some(EntityHandle::Db(keys[0])));
    }

    #[test]
    fn new_generation_overwrites_without_conflict() {
        let keys = make_keys(2);
        let mut token = MockRef::new(EntityKind::Item, "sword");

        let first = MapLookup::with(&[(EntityKind::Item, "sword", EntityHandle::Db(keys[0]))]);
        token.resolve(1, &first).unwrap();

        let rebuilt = MapLookup::with(&[(EntityKind::Item, "sword", EntityHandle::Db(keys[1]))]);
        let handle = token.resolve(2, &rebuilt).unwrap();
        assert_eq!(handle, EntityHandle::Db(keys[1]));
        assert_eq!(token.handle_for(2), Some(EntityHandle::Db(keys[1])));
        // The old generation's handle is stale.
        assert_eq!(token.handle_for(1), None);
    }

    #[test]
    fn pending_upgrades_to_db_in_same_generation() {
        let keys = make_keys(1);
        let pending = EntityHandle::Pending {
            kind: EntityKind::StatusEffect,
            index: 3,
        };
        let mut token = MockRef::new(EntityKind::StatusEffect, "frost_ward");

        let tier_pending = MapLookup::with(&[(EntityKind::StatusEffect, "frost_ward", pending)]);
        token.resolve(5, &tier_pending).unwrap();

        let tier_db =
            MapLookup::with(&[(EntityKind::StatusEffect, "frost_ward", EntityHandle::Db(keys[0]))]);
        let handle = token.resolve(5, &tier_db).unwrap();
        assert_eq!(handle, EntityHandle::Db(keys[0]));
    }
}
