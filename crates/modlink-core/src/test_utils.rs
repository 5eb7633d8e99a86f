//! In-memory host database and declaration helpers for tests.
//!
//! Gated behind the `test-utils` feature so integration tests can drive the
//! pipeline without a real host application.

use crate::entity::{CustomItem, CustomRecipe, CustomStatusEffect, ExtensionInfo};
use crate::host::{
    HostDatabase, HostEntity, ItemEntity, PlayerSession, PrefabEntity, StationEntity,
};
use crate::id::{EntityKey, EntityKind, Generation};
use crate::mock::MockRef;
use slotmap::SlotMap;
use std::collections::HashMap;

pub const TEST_GUID: &str = "com.example.testmod";

pub fn test_extension() -> ExtensionInfo {
    ExtensionInfo::new(TEST_GUID, "TestMod", "0.1.0")
}

pub fn item(name: &str, prefab: &str) -> CustomItem {
    CustomItem::new(name, prefab, test_extension())
}

pub fn recipe_at(name: &str, result: &str, station: Option<&str>) -> CustomRecipe {
    let mut recipe = CustomRecipe::new(name, result, test_extension());
    recipe.crafting_station = station.map(|s| MockRef::new(EntityKind::Station, s));
    recipe
}

pub fn effect(name: &str) -> CustomStatusEffect {
    CustomStatusEffect::new(name, "buff", test_extension())
}

// ---------------------------------------------------------------------------
// MemoryDb
// ---------------------------------------------------------------------------

/// Host database over a slot map with a derived name index. The index is
/// recomputed only by `rebuild_index`, so entities inserted since the last
/// rebuild are invisible to `find`, exactly like the real host.
#[derive(Debug, Default)]
pub struct MemoryDb {
    generation: Generation,
    entities: SlotMap<EntityKey, HostEntity>,
    index: HashMap<(EntityKind, String), EntityKey>,
    marker: Option<(EntityKind, String)>,
    pub rebuild_count: usize,
}

impl MemoryDb {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    /// Names the canonical always-present entity backing `is_authoritative`.
    pub fn set_marker(&mut self, kind: EntityKind, name: &str) {
        self.marker = Some((kind, name.to_string()));
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind() == kind).count()
    }
}

impl HostDatabase for MemoryDb {
    fn generation(&self) -> Generation {
        self.generation
    }

    fn is_authoritative(&self) -> bool {
        match &self.marker {
            Some((kind, name)) => self.find(*kind, name).is_some(),
            None => false,
        }
    }

    fn find(&self, kind: EntityKind, name: &str) -> Option<EntityKey> {
        self.index.get(&(kind, name.to_string())).copied()
    }

    fn insert(&mut self, entity: HostEntity) -> EntityKey {
        self.entities.insert(entity)
    }

    fn entity(&self, key: EntityKey) -> Option<&HostEntity> {
        self.entities.get(key)
    }

    fn entity_mut(&mut self, key: EntityKey) -> Option<&mut HostEntity> {
        self.entities.get_mut(key)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (key, entity) in &self.entities {
            self.index
                .insert((entity.kind(), entity.name().to_string()), key);
        }
        self.rebuild_count += 1;
    }
}

/// A database primed with the vanilla content the tests reference: a `wood`
/// item, `forge` and `workbench` stations. The wood item doubles as the
/// authoritative marker.
pub fn vanilla_db(generation: Generation) -> MemoryDb {
    let mut db = MemoryDb::new(generation);
    let wood_prefab = db.insert(HostEntity::Prefab(PrefabEntity {
        name: "wood".into(),
    }));
    db.insert(HostEntity::Item(ItemEntity {
        name: "wood".into(),
        token: "$wood".into(),
        prefab: wood_prefab,
        drop_prefab: None,
        equip_effect: None,
    }));
    db.insert(HostEntity::Station(StationEntity {
        name: "forge".into(),
        max_level: 3,
    }));
    db.insert(HostEntity::Station(StationEntity {
        name: "workbench".into(),
        max_level: 4,
    }));
    db.rebuild_index();
    db.set_marker(EntityKind::Item, "wood");
    db
}

pub fn db_add_prefab(db: &mut MemoryDb, name: &str) -> EntityKey {
    let key = db.insert(HostEntity::Prefab(PrefabEntity {
        name: name.to_string(),
    }));
    db.rebuild_index();
    key
}

// ---------------------------------------------------------------------------
// TestPlayer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TestPlayer {
    pub refresh_count: usize,
}

impl PlayerSession for TestPlayer {
    fn refresh_known_recipes(&mut self) {
        self.refresh_count += 1;
    }
}
