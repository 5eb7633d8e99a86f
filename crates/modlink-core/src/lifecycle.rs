//! Coordination between host lifecycle events and resolution passes.
//!
//! The host reaches three points the pipeline cares about: an early database
//! copy (possibly non-authoritative), full database initialization, and a
//! player profile load. The coordinator decides per event whether a
//! resolution pass runs, flips the `mocks_active` switch accordingly, and
//! delivers observer notifications around the pass.
//!
//! Observer lists come in two flavors. `before_resolution` and
//! `after_resolution` are one-shot: the list is taken before firing, so a
//! callback that re-subscribes during delivery lands on the fresh list and
//! waits for the next cycle. `items_registered` is persistent and fires after
//! every initialization cycle, authoritative or not.

use crate::host::{HostDatabase, PlayerSession};
use crate::id::EntityKind;
use crate::resolver::{ResolutionReport, Resolver};
use crate::store::PendingStore;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

/// A lifecycle observer. It receives the pending store so it can register
/// additional declarations, which are picked up on the next cycle.
pub type Notification = Rc<dyn Fn(&mut PendingStore)>;

pub struct LifecycleCoordinator {
    /// True while references are still unresolved placeholders. Starts true;
    /// cleared by the first resolution pass against an authoritative
    /// database, re-raised when a non-authoritative copy arrives.
    mocks_active: bool,
    before_resolution: Vec<Notification>,
    after_resolution: Vec<Notification>,
    items_registered: Vec<Notification>,
}

impl Default for LifecycleCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleCoordinator {
    pub fn new() -> Self {
        Self {
            mocks_active: true,
            before_resolution: Vec::new(),
            after_resolution: Vec::new(),
            items_registered: Vec::new(),
        }
    }

    pub fn mocks_active(&self) -> bool {
        self.mocks_active
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    pub fn subscribe_before_resolution(&mut self, callback: Notification) {
        Self::subscribe(&mut self.before_resolution, callback);
    }

    pub fn subscribe_after_resolution(&mut self, callback: Notification) {
        Self::subscribe(&mut self.after_resolution, callback);
    }

    pub fn subscribe_items_registered(&mut self, callback: Notification) {
        Self::subscribe(&mut self.items_registered, callback);
    }

    /// Subscription dedups by `Rc` pointer identity, so the same closure
    /// object never fires twice in one delivery.
    fn subscribe(list: &mut Vec<Notification>, callback: Notification) {
        if list.iter().any(|existing| Rc::ptr_eq(existing, &callback)) {
            log::warn!("callback already subscribed, ignoring");
            return;
        }
        list.push(callback);
    }

    // -----------------------------------------------------------------------
    // Event entry points
    // -----------------------------------------------------------------------

    /// The host produced an early database copy. Non-authoritative copies
    /// keep everything unresolved; authoritative ones run an items-only pass.
    pub fn database_copied(
        &mut self,
        store: &mut PendingStore,
        resolver: &Resolver,
        db: &mut dyn HostDatabase,
    ) -> Option<ResolutionReport> {
        if !db.is_authoritative() {
            log::debug!("non-authoritative database copy, keeping references unresolved");
            self.mocks_active = true;
            return None;
        }
        self.mocks_active = false;
        Self::fire_once(&mut self.before_resolution, store, "before-resolution");
        let report = resolver.resolve_kinds(&[EntityKind::Item], store, db);
        Self::fire_once(&mut self.after_resolution, store, "after-resolution");
        Some(report)
    }

    /// The host finished building the full database. Runs the full pass when
    /// authoritative; `items_registered` observers fire either way.
    pub fn database_initialized(
        &mut self,
        store: &mut PendingStore,
        resolver: &Resolver,
        db: &mut dyn HostDatabase,
    ) -> Option<ResolutionReport> {
        let report = if db.is_authoritative() {
            self.mocks_active = false;
            Self::fire_once(&mut self.before_resolution, store, "before-resolution");
            let report = resolver.resolve_all(store, db);
            Self::fire_once(&mut self.after_resolution, store, "after-resolution");
            Some(report)
        } else {
            log::debug!("non-authoritative database init, keeping references unresolved");
            self.mocks_active = true;
            None
        };
        Self::fire_all(&self.items_registered, store, "items-registered");
        report
    }

    /// A player profile finished loading. Pure pass-through to the session
    /// when one exists.
    pub fn player_loaded(&mut self, player: Option<&mut dyn PlayerSession>) {
        if let Some(player) = player {
            player.refresh_known_recipes();
        }
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    fn fire_once(list: &mut Vec<Notification>, store: &mut PendingStore, stage: &str) {
        let callbacks = std::mem::take(list);
        for callback in &callbacks {
            Self::deliver(callback, store, stage);
        }
    }

    fn fire_all(list: &[Notification], store: &mut PendingStore, stage: &str) {
        for callback in list {
            Self::deliver(callback, store, stage);
        }
    }

    /// A panicking callback must not take down the cycle or starve the
    /// callbacks after it.
    fn deliver(callback: &Notification, store: &mut PendingStore, stage: &str) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(store))) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            log::error!("{stage} callback panicked: {message}");
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use std::cell::Cell;

    // -----------------------------------------------------------------------
    // Test 1: Non-authoritative copy resolves nothing
    // -----------------------------------------------------------------------
    #[test]
    fn non_authoritative_copy_is_a_no_op() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut db = MemoryDb::new(1); // no marker, not authoritative
        db_add_prefab(&mut db, "sword_prefab");
        store.add_item(item("sword", "sword_prefab"));

        let report = coordinator.database_copied(&mut store, &resolver, &mut db);
        assert!(report.is_none());
        assert!(coordinator.mocks_active());
        assert!(db.find(EntityKind::Item, "sword").is_none());
    }

    // -----------------------------------------------------------------------
    // Test 2: Authoritative copy resolves items only and flips the switch
    // -----------------------------------------------------------------------
    #[test]
    fn authoritative_copy_resolves_items_only() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut db = vanilla_db(1);
        db_add_prefab(&mut db, "sword_prefab");
        store.add_item(item("sword", "sword_prefab"));
        store.add_recipe(recipe_at("Recipe_sword", "sword", Some("forge")));

        assert!(coordinator.mocks_active());
        let report = coordinator
            .database_copied(&mut store, &resolver, &mut db)
            .unwrap();
        assert!(!coordinator.mocks_active());
        assert_eq!(report.added, 1);
        assert!(db.find(EntityKind::Item, "sword").is_some());
        assert!(db.find(EntityKind::Recipe, "Recipe_sword").is_none());
    }

    // -----------------------------------------------------------------------
    // Test 3: One-shot lists fire once across cycles
    // -----------------------------------------------------------------------
    #[test]
    fn after_resolution_fires_once() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut db = vanilla_db(1);

        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        coordinator.subscribe_after_resolution(Rc::new(move |_| counter.set(counter.get() + 1)));

        coordinator.database_initialized(&mut store, &resolver, &mut db);
        coordinator.database_initialized(&mut store, &resolver, &mut db);
        assert_eq!(count.get(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 4: items_registered persists and fires even without authority
    // -----------------------------------------------------------------------
    #[test]
    fn items_registered_is_persistent() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut authoritative = vanilla_db(1);
        let mut bare = MemoryDb::new(1);

        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        coordinator.subscribe_items_registered(Rc::new(move |_| counter.set(counter.get() + 1)));

        coordinator.database_initialized(&mut store, &resolver, &mut authoritative);
        coordinator.database_initialized(&mut store, &resolver, &mut bare);
        assert_eq!(count.get(), 2);
    }

    // -----------------------------------------------------------------------
    // Test 5: Duplicate subscription by pointer identity is dropped
    // -----------------------------------------------------------------------
    #[test]
    fn duplicate_subscription_ignored() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut db = vanilla_db(1);

        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let callback: Notification = Rc::new(move |_| counter.set(counter.get() + 1));
        coordinator.subscribe_after_resolution(callback.clone());
        coordinator.subscribe_after_resolution(callback);

        coordinator.database_initialized(&mut store, &resolver, &mut db);
        assert_eq!(count.get(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 6: A panicking callback does not starve the rest
    // -----------------------------------------------------------------------
    #[test]
    fn panicking_callback_is_isolated() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut db = vanilla_db(1);

        coordinator.subscribe_after_resolution(Rc::new(|_| panic!("observer bug")));
        let reached = Rc::new(Cell::new(false));
        let flag = reached.clone();
        coordinator.subscribe_after_resolution(Rc::new(move |_| flag.set(true)));

        let report = coordinator.database_initialized(&mut store, &resolver, &mut db);
        assert!(report.is_some());
        assert!(reached.get());
    }

    // -----------------------------------------------------------------------
    // Test 7: before_resolution fires before the pass runs
    // -----------------------------------------------------------------------
    #[test]
    fn before_resolution_registration_joins_same_cycle() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut db = vanilla_db(1);
        db_add_prefab(&mut db, "early_prefab");

        coordinator.subscribe_before_resolution(Rc::new(|store: &mut PendingStore| {
            store.add_item(item("early_bird", "early_prefab"));
        }));

        let report = coordinator
            .database_initialized(&mut store, &resolver, &mut db)
            .unwrap();
        assert_eq!(report.added, 1);
        assert!(db.find(EntityKind::Item, "early_bird").is_some());
    }

    // -----------------------------------------------------------------------
    // Test 8: A callback can register declarations for the next cycle
    // -----------------------------------------------------------------------
    #[test]
    fn callback_registration_is_picked_up_next_cycle() {
        let mut coordinator = LifecycleCoordinator::new();
        let resolver = Resolver::default();
        let mut store = PendingStore::new();
        let mut db = vanilla_db(1);
        db_add_prefab(&mut db, "late_prefab");

        coordinator.subscribe_after_resolution(Rc::new(|store: &mut PendingStore| {
            store.add_item(item("latecomer", "late_prefab"));
        }));

        let first = coordinator
            .database_initialized(&mut store, &resolver, &mut db)
            .unwrap();
        assert_eq!(first.added, 0);
        assert!(db.find(EntityKind::Item, "latecomer").is_none());

        let second = coordinator
            .database_initialized(&mut store, &resolver, &mut db)
            .unwrap();
        assert_eq!(second.added, 1);
        assert!(db.find(EntityKind::Item, "latecomer").is_some());
    }

    // -----------------------------------------------------------------------
    // Test 9: Player load passes through to the session
    // -----------------------------------------------------------------------
    #[test]
    fn player_load_refreshes_known_recipes() {
        let mut coordinator = LifecycleCoordinator::new();
        let mut player = TestPlayer::default();

        coordinator.player_loaded(Some(&mut player));
        assert_eq!(player.refresh_count, 1);

        coordinator.player_loaded(None);
        assert_eq!(player.refresh_count, 1);
    }
}
