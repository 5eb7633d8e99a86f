//! The facade extensions and host glue talk to.
//!
//! Owns the pending store, the resolver, and the lifecycle coordinator.
//! Extensions register declarations and subscribe to lifecycle
//! notifications; the host glue calls the `handle_*` entry points when its
//! lifecycle reaches them, passing a database handle when one exists.

use crate::entity::{CustomItem, CustomRecipe, CustomStatusEffect};
use crate::host::{HostDatabase, PlayerSession};
use crate::lifecycle::{LifecycleCoordinator, Notification};
use crate::resolver::{ResolutionReport, Resolver};
use crate::store::{AddOutcome, PendingStore};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A lifecycle cycle fired without a database handle. The cycle aborts;
    /// pending declarations are untouched and resolve on a later cycle.
    #[error("host database unavailable for this lifecycle cycle")]
    DatabaseUnavailable,
}

#[derive(Default)]
pub struct ContentPipeline {
    store: PendingStore,
    resolver: Resolver,
    coordinator: LifecycleCoordinator,
}

impl ContentPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: Resolver) -> Self {
        Self {
            resolver,
            ..Self::default()
        }
    }

    /// Read access for the query surface in [`crate::registry`].
    pub fn store(&self) -> &PendingStore {
        &self.store
    }

    /// True until a resolution pass has run against an authoritative
    /// database.
    pub fn mocks_active(&self) -> bool {
        self.coordinator.mocks_active()
    }

    // -----------------------------------------------------------------------
    // Extension surface
    // -----------------------------------------------------------------------

    /// Registration is valid at any time, including from `after_resolution`
    /// callbacks; entries added mid-cycle are picked up on the next cycle.
    /// Returns false on a duplicate (the original is kept).
    pub fn register_item(&mut self, item: CustomItem) -> bool {
        self.store.add_item(item) == AddOutcome::Added
    }

    pub fn register_recipe(&mut self, recipe: CustomRecipe) -> bool {
        self.store.add_recipe(recipe) == AddOutcome::Added
    }

    pub fn register_status_effect(&mut self, effect: CustomStatusEffect) -> bool {
        self.store.add_status_effect(effect) == AddOutcome::Added
    }

    pub fn subscribe_before_resolution(&mut self, callback: Notification) {
        self.coordinator.subscribe_before_resolution(callback);
    }

    pub fn subscribe_after_resolution(&mut self, callback: Notification) {
        self.coordinator.subscribe_after_resolution(callback);
    }

    pub fn subscribe_items_registered(&mut self, callback: Notification) {
        self.coordinator.subscribe_items_registered(callback);
    }

    // -----------------------------------------------------------------------
    // Host glue entry points
    // -----------------------------------------------------------------------

    /// Early database copy. `Ok(None)` means the copy was not authoritative
    /// and nothing was resolved.
    pub fn handle_database_copy(
        &mut self,
        db: Option<&mut dyn HostDatabase>,
    ) -> Result<Option<ResolutionReport>, PipelineError> {
        let db = db.ok_or(PipelineError::DatabaseUnavailable)?;
        Ok(self
            .coordinator
            .database_copied(&mut self.store, &self.resolver, db))
    }

    /// Full database initialization.
    pub fn handle_database_init(
        &mut self,
        db: Option<&mut dyn HostDatabase>,
    ) -> Result<Option<ResolutionReport>, PipelineError> {
        let db = db.ok_or(PipelineError::DatabaseUnavailable)?;
        Ok(self
            .coordinator
            .database_initialized(&mut self.store, &self.resolver, db))
    }

    /// Player profile load.
    pub fn handle_player_load(&mut self, player: Option<&mut dyn PlayerSession>) {
        self.coordinator.player_loaded(player);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityKind;
    use crate::test_utils::*;

    #[test]
    fn duplicate_registration_returns_false() {
        let mut pipeline = ContentPipeline::new();
        assert!(pipeline.register_item(item("sword", "sword_prefab")));
        assert!(!pipeline.register_item(item("sword", "other_prefab")));
        assert_eq!(pipeline.store().item_count(), 1);
    }

    #[test]
    fn missing_database_aborts_the_cycle() {
        let mut pipeline = ContentPipeline::new();
        pipeline.register_item(item("sword", "sword_prefab"));

        assert_eq!(
            pipeline.handle_database_init(None),
            Err(PipelineError::DatabaseUnavailable)
        );
        assert!(pipeline.mocks_active());

        // The store survived the aborted cycle and resolves later.
        let mut db = vanilla_db(1);
        db_add_prefab(&mut db, "sword_prefab");
        let report = pipeline.handle_database_init(Some(&mut db)).unwrap().unwrap();
        assert_eq!(report.added, 1);
        assert!(!pipeline.mocks_active());
    }

    #[test]
    fn copy_then_init_full_flow() {
        let mut pipeline = ContentPipeline::new();
        let mut db = vanilla_db(1);
        db_add_prefab(&mut db, "axe_prefab");
        pipeline.register_item(item("axe", "axe_prefab"));
        pipeline.register_recipe(recipe_at("Recipe_axe", "axe", Some("forge")));

        let copy = pipeline.handle_database_copy(Some(&mut db)).unwrap().unwrap();
        assert_eq!(copy.added, 1);
        assert!(db.find(EntityKind::Recipe, "Recipe_axe").is_none());

        let init = pipeline.handle_database_init(Some(&mut db)).unwrap().unwrap();
        assert_eq!(init.added, 1);
        assert_eq!(init.already_present, 1);
        assert!(db.find(EntityKind::Recipe, "Recipe_axe").is_some());
    }

    #[test]
    fn player_load_without_session_is_fine() {
        let mut pipeline = ContentPipeline::new();
        pipeline.handle_player_load(None);

        let mut player = TestPlayer::default();
        pipeline.handle_player_load(Some(&mut player));
        assert_eq!(player.refresh_count, 1);
    }
}
