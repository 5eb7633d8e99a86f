//! Append-only store of declarations awaiting resolution.
//!
//! One insertion-ordered collection per declaration kind. Entries are never
//! removed, not even after successful resolution: a later lifecycle replay
//! re-resolves every entry against the freshly rebuilt host database, and the
//! stable insertion indices double as process-lifetime identities for
//! [`crate::id::EntityHandle::Pending`] handles.
//!
//! Duplicate registration is rejected with a diagnostic, never an error: the
//! original entry is kept and the caller is told via [`AddOutcome`].

use crate::entity::{CustomItem, CustomRecipe, CustomStatusEffect};
use crate::id::EntityKind;
use std::collections::HashMap;

/// Result of an `add_*` call. Never an error; callers warn on
/// `AlreadyPresent` and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Ordered, deduplicating collections of pending declarations.
#[derive(Debug, Default)]
pub struct PendingStore {
    items: Vec<CustomItem>,
    recipes: Vec<CustomRecipe>,
    status_effects: Vec<CustomStatusEffect>,

    item_names: HashMap<String, u32>,
    /// Second dedup level: two differently named item declarations wrapping
    /// the same prefab are the same underlying object.
    item_prefabs: HashMap<String, u32>,
    recipe_names: HashMap<String, u32>,
    effect_names: HashMap<String, u32>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn add_item(&mut self, item: CustomItem) -> AddOutcome {
        if self.item_names.contains_key(&item.name) {
            log::warn!(
                "custom item {:?} already registered (by {}), keeping the original",
                item.name,
                item.source.guid
            );
            return AddOutcome::AlreadyPresent;
        }
        if let Some(&idx) = self.item_prefabs.get(item.prefab.name()) {
            log::warn!(
                "custom item {:?} wraps prefab {:?} already registered as {:?}",
                item.name,
                item.prefab.name(),
                self.items[idx as usize].name
            );
            return AddOutcome::AlreadyPresent;
        }

        let idx = self.items.len() as u32;
        self.item_names.insert(item.name.clone(), idx);
        self.item_prefabs.insert(item.prefab.name().to_string(), idx);
        self.items.push(item);
        AddOutcome::Added
    }

    pub fn add_recipe(&mut self, recipe: CustomRecipe) -> AddOutcome {
        if self.recipe_names.contains_key(&recipe.name) {
            log::warn!(
                "custom recipe {:?} already registered (by {}), keeping the original",
                recipe.name,
                recipe.source.guid
            );
            return AddOutcome::AlreadyPresent;
        }
        let idx = self.recipes.len() as u32;
        self.recipe_names.insert(recipe.name.clone(), idx);
        self.recipes.push(recipe);
        AddOutcome::Added
    }

    pub fn add_status_effect(&mut self, effect: CustomStatusEffect) -> AddOutcome {
        if self.effect_names.contains_key(&effect.name) {
            log::warn!(
                "custom status effect {:?} already registered (by {}), keeping the original",
                effect.name,
                effect.source.guid
            );
            return AddOutcome::AlreadyPresent;
        }
        let idx = self.status_effects.len() as u32;
        self.effect_names.insert(effect.name.clone(), idx);
        self.status_effects.push(effect);
        AddOutcome::Added
    }

    // -----------------------------------------------------------------------
    // Ordered access
    // -----------------------------------------------------------------------

    pub fn items(&self) -> impl Iterator<Item = &CustomItem> {
        self.items.iter()
    }

    pub fn recipes(&self) -> impl Iterator<Item = &CustomRecipe> {
        self.recipes.iter()
    }

    pub fn status_effects(&self) -> impl Iterator<Item = &CustomStatusEffect> {
        self.status_effects.iter()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn status_effect_count(&self) -> usize {
        self.status_effects.len()
    }

    /// Index of a pending declaration by kind and name. Only declaration
    /// kinds participate; prefabs and stations live solely in the host.
    pub fn find_pending(&self, kind: EntityKind, name: &str) -> Option<u32> {
        match kind {
            EntityKind::Item => self.item_names.get(name).copied(),
            EntityKind::Recipe => self.recipe_names.get(name).copied(),
            EntityKind::StatusEffect => self.effect_names.get(name).copied(),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Resolver access (the only mutation path after registration)
    // -----------------------------------------------------------------------

    pub(crate) fn items_mut(&mut self) -> &mut [CustomItem] {
        &mut self.items
    }

    pub(crate) fn recipes_mut(&mut self) -> &mut [CustomRecipe] {
        &mut self.recipes
    }

    pub(crate) fn status_effects_mut(&mut self) -> &mut [CustomStatusEffect] {
        &mut self.status_effects
    }
}

// ===========================================================================
// Tests
// ===========================================================================
