//! Read-only queries over pending declarations.
//!
//! Everything here is lazy and restartable; nothing mutates the store.
//! Per-extension filters match on the provenance guid declarations carry.

use crate::entity::{CustomItem, CustomRecipe, CustomStatusEffect};
use crate::store::PendingStore;

pub fn items(store: &PendingStore) -> impl Iterator<Item = &CustomItem> {
    store.items()
}

pub fn recipes(store: &PendingStore) -> impl Iterator<Item = &CustomRecipe> {
    store.recipes()
}

pub fn status_effects(store: &PendingStore) -> impl Iterator<Item = &CustomStatusEffect> {
    store.status_effects()
}

pub fn items_by_extension<'s>(
    store: &'s PendingStore,
    guid: &str,
) -> impl Iterator<Item = &'s CustomItem> {
    store.items().filter(move |i| i.source.guid == guid)
}

pub fn recipes_by_extension<'s>(
    store: &'s PendingStore,
    guid: &str,
) -> impl Iterator<Item = &'s CustomRecipe> {
    store.recipes().filter(move |r| r.source.guid == guid)
}

pub fn status_effects_by_extension<'s>(
    store: &'s PendingStore,
    guid: &str,
) -> impl Iterator<Item = &'s CustomStatusEffect> {
    store.status_effects().filter(move |e| e.source.guid == guid)
}

/// Everything one extension has registered, in registration order per kind.
#[derive(Debug, Default, Clone)]
pub struct ExtensionContent<'s> {
    pub items: Vec<&'s CustomItem>,
    pub recipes: Vec<&'s CustomRecipe>,
    pub status_effects: Vec<&'s CustomStatusEffect>,
}

impl ExtensionContent<'_> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.recipes.is_empty() && self.status_effects.is_empty()
    }
}

pub fn extension_content<'s>(store: &'s PendingStore, guid: &str) -> ExtensionContent<'s> {
    ExtensionContent {
        items: items_by_extension(store, guid).collect(),
        recipes: recipes_by_extension(store, guid).collect(),
        status_effects: status_effects_by_extension(store, guid).collect(),
    }
}
