//! The boundary to the host application.
//!
//! The host database is an external mutable collection the pipeline appends
//! to. This module defines the trait the pipeline needs from it, and the
//! native entity records the resolver converts declarations into. Everything
//! else about the host (storage format, rendering, persistence) is opaque.

use crate::id::{EntityKey, EntityKind, Generation};

// ---------------------------------------------------------------------------
// Native entity records
// ---------------------------------------------------------------------------

/// A prefab known to the host. Prefab registration itself is host glue; the
/// pipeline only ever looks prefabs up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabEntity {
    pub name: String,
}

/// An item as stored in the host database. Link fields hold database keys;
/// `drop_prefab` and `equip_effect` start empty and are patched by the
/// resolver's fixup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntity {
    pub name: String,
    pub token: String,
    pub prefab: EntityKey,
    pub drop_prefab: Option<EntityKey>,
    pub equip_effect: Option<EntityKey>,
}

/// A crafting or repair station. Stations are vanilla host content; the
/// pipeline resolves references to them but never creates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationEntity {
    pub name: String,
    pub max_level: u32,
}

/// One resource requirement of a recipe. `item` starts empty and is patched
/// by the fixup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementEntity {
    pub item: Option<EntityKey>,
    pub amount: u32,
    pub per_level: u32,
}

/// A recipe as stored in the host database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeEntity {
    pub name: String,
    pub result: EntityKey,
    pub amount: u32,
    pub enabled: bool,
    pub crafting_station: Option<EntityKey>,
    pub repair_station: Option<EntityKey>,
    pub min_station_level: u32,
    pub requirements: Vec<RequirementEntity>,
}

/// A status effect as stored in the host database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEffectEntity {
    pub name: String,
    pub category: String,
    pub icon_item: Option<EntityKey>,
}

/// Any entity the host database can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEntity {
    Prefab(PrefabEntity),
    Item(ItemEntity),
    Station(StationEntity),
    Recipe(RecipeEntity),
    StatusEffect(StatusEffectEntity),
}

impl HostEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            HostEntity::Prefab(_) => EntityKind::Prefab,
            HostEntity::Item(_) => EntityKind::Item,
            HostEntity::Station(_) => EntityKind::Station,
            HostEntity::Recipe(_) => EntityKind::Recipe,
            HostEntity::StatusEffect(_) => EntityKind::StatusEffect,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            HostEntity::Prefab(e) => &e.name,
            HostEntity::Item(e) => &e.name,
            HostEntity::Station(e) => &e.name,
            HostEntity::Recipe(e) => &e.name,
            HostEntity::StatusEffect(e) => &e.name,
        }
    }
}

// ---------------------------------------------------------------------------
// Host traits
// ---------------------------------------------------------------------------

/// The authoritative game database, owned by the host application.
///
/// `find` must consult only the host's derived name index -- entities appended
/// since the last `rebuild_index` are deliberately invisible to it. That is
/// what makes the consistency pass observable: the resolver calls
/// `rebuild_index` exactly once after each kind batch, never mid-batch.
pub trait HostDatabase {
    /// Bumped by the host whenever the database is rebuilt from scratch.
    fn generation(&self) -> Generation;

    /// Host-provided predicate: does the canonical always-present entity
    /// exist in this database instance?
    fn is_authoritative(&self) -> bool;

    /// Look up an entity by kind and name via the derived index.
    fn find(&self, kind: EntityKind, name: &str) -> Option<EntityKey>;

    /// Append an entity and return its key. Does not update the index.
    fn insert(&mut self, entity: HostEntity) -> EntityKey;

    fn entity(&self, key: EntityKey) -> Option<&HostEntity>;

    fn entity_mut(&mut self, key: EntityKey) -> Option<&mut HostEntity>;

    /// Recompute the derived name index over the current contents.
    fn rebuild_index(&mut self);
}

/// A loaded player profile. The pipeline only ever asks the host to refresh
/// the player's known-recipe list after a full initialization cycle.
pub trait PlayerSession {
    fn refresh_known_recipes(&mut self);
}
