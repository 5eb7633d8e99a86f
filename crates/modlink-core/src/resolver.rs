//! The resolution engine: turns pending declarations into host entities.
//!
//! One resolution pass walks the pending store kind by kind (items before
//! recipes before status effects, so names are appendable before anything
//! that references them), and declaration by declaration in insertion order.
//! Forward references are satisfied without a dependency graph by a chained
//! lookup: the host's derived index first, then entities appended earlier in
//! the same pass, then (for second-order links) declarations still pending.
//!
//! A pass never throws for data errors. A declaration whose required
//! reference cannot be resolved is skipped and reported with its extension
//! provenance; the batch continues. Replays are idempotent: an identity check
//! before every append skips declarations the database already contains.

use crate::entity::ExtensionInfo;
use crate::host::{
    HostDatabase, HostEntity, ItemEntity, RecipeEntity, RequirementEntity, StatusEffectEntity,
};
use crate::id::{EntityHandle, EntityKey, EntityKind, Generation};
use crate::mock::{EntityLookup, MockError, MockRef};
use crate::store::PendingStore;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Kind-priority order for a resolution pass. The default order guarantees
/// that items exist before the recipes and status effects that reference
/// them; new declaration kinds slot in by extending the order.
#[derive(Debug, Clone)]
pub struct ResolutionStrategy {
    kind_order: Vec<EntityKind>,
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        Self {
            kind_order: vec![EntityKind::Item, EntityKind::Recipe, EntityKind::StatusEffect],
        }
    }
}

impl ResolutionStrategy {
    pub fn new(kind_order: Vec<EntityKind>) -> Self {
        Self { kind_order }
    }

    pub fn kind_order(&self) -> &[EntityKind] {
        &self.kind_order
    }

    /// The requested kinds, reordered by strategy priority.
    fn restrict(&self, requested: &[EntityKind]) -> Vec<EntityKind> {
        self.kind_order
            .iter()
            .copied()
            .filter(|k| requested.contains(k))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One unresolved reference, attributed to the extension that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub kind: EntityKind,
    /// Name of the declaration that could not be completed.
    pub declaration: String,
    /// The name that could not be found anywhere.
    pub unresolved: String,
    /// Guid of the owning extension.
    pub extension: String,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub added: usize,
    pub already_present: usize,
    pub failed: usize,
    /// Failures in the order they were encountered.
    pub failures: Vec<ResolutionFailure>,
}

impl ResolutionReport {
    fn record_failure(
        &mut self,
        kind: EntityKind,
        declaration: &str,
        unresolved: &str,
        source: &ExtensionInfo,
    ) {
        log::warn!(
            "skipping {kind:?} {declaration:?} from {}: unresolved reference {unresolved:?}",
            source.guid
        );
        self.failed += 1;
        self.failures.push(ResolutionFailure {
            kind,
            declaration: declaration.to_string(),
            unresolved: unresolved.to_string(),
            extension: source.guid.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Per-pass state and lookup chain
// ---------------------------------------------------------------------------

/// Name index over pending declarations, snapshotted before the pass starts
/// mutating them. Names never change during a pass, so the snapshot stays
/// accurate.
struct PendingIndex {
    names: HashMap<(EntityKind, String), u32>,
}

impl PendingIndex {
    fn snapshot(store: &PendingStore) -> Self {
        let mut names = HashMap::new();
        for (idx, item) in store.items().enumerate() {
            names.insert((EntityKind::Item, item.name.clone()), idx as u32);
        }
        for (idx, recipe) in store.recipes().enumerate() {
            names.insert((EntityKind::Recipe, recipe.name.clone()), idx as u32);
        }
        for (idx, effect) in store.status_effects().enumerate() {
            names.insert((EntityKind::StatusEffect, effect.name.clone()), idx as u32);
        }
        Self { names }
    }

    fn find(&self, kind: EntityKind, name: &str) -> Option<u32> {
        self.names.get(&(kind, name.to_string())).copied()
    }
}

/// Mutable bookkeeping for one pass: which pending declaration ended up
/// behind which database key.
struct Pass {
    generation: Generation,
    by_index: HashMap<(EntityKind, u32), EntityKey>,
    by_name: HashMap<(EntityKind, String), EntityKey>,
}

impl Pass {
    fn new(generation: Generation) -> Self {
        Self {
            generation,
            by_index: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    fn record(&mut self, kind: EntityKind, index: u32, name: &str, key: EntityKey) {
        self.by_index.insert((kind, index), key);
        self.by_name.insert((kind, name.to_string()), key);
    }

    /// Translate a handle into a database key, if the target has actually
    /// been appended (or already existed).
    fn to_key(&self, handle: EntityHandle) -> Option<EntityKey> {
        match handle {
            EntityHandle::Db(key) => Some(key),
            EntityHandle::Pending { kind, index } => self.by_index.get(&(kind, index)).copied(),
        }
    }
}

/// The ordered lookup chain used to resolve tokens during a pass:
/// host index, then this-pass appends, then (optionally) pending
/// declarations that have not been appended yet.
struct PassLookup<'a> {
    db: &'a dyn HostDatabase,
    appended: &'a HashMap<(EntityKind, String), EntityKey>,
    pending: Option<&'a PendingIndex>,
}

impl<'a> PassLookup<'a> {
    fn appended_only(
        db: &'a dyn HostDatabase,
        appended: &'a HashMap<(EntityKind, String), EntityKey>,
    ) -> Self {
        Self {
            db,
            appended,
            pending: None,
        }
    }

    fn with_pending(
        db: &'a dyn HostDatabase,
        appended: &'a HashMap<(EntityKind, String), EntityKey>,
        pending: &'a PendingIndex,
    ) -> Self {
        Self {
            db,
            appended,
            pending: Some(pending),
        }
    }
}

impl EntityLookup for PassLookup<'_> {
    fn find(&self, kind: EntityKind, name: &str) -> Option<EntityHandle> {
        if let Some(key) = self.db.find(kind, name) {
            return Some(EntityHandle::Db(key));
        }
        if let Some(&key) = self.appended.get(&(kind, name.to_string())) {
            return Some(EntityHandle::Db(key));
        }
        if let Some(pending) = self.pending
            && let Some(index) = pending.find(kind, name)
        {
            return Some(EntityHandle::Pending { kind, index });
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves pending declarations into the host database according to a
/// [`ResolutionStrategy`].
#[derive(Debug, Default)]
pub struct Resolver {
    strategy: ResolutionStrategy,
}

impl Resolver {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self { strategy }
    }

    /// Resolve every declaration kind in strategy order.
    pub fn resolve_all(
        &self,
        store: &mut PendingStore,
        db: &mut dyn HostDatabase,
    ) -> ResolutionReport {
        let kinds = self.strategy.kind_order.clone();
        self.resolve_kinds(&kinds, store, db)
    }

    /// Resolve only the requested kinds (the lightweight database-copy cycle
    /// passes items only). The derived index is rebuilt once after each kind
    /// batch, never mid-batch; the guarded fixup sub-pass runs after all
    /// batches so it can see everything the pass appended.
    pub fn resolve_kinds(
        &self,
        kinds: &[EntityKind],
        store: &mut PendingStore,
        db: &mut dyn HostDatabase,
    ) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        let mut pass = Pass::new(db.generation());
        let pending = PendingIndex::snapshot(store);
        let kinds = self.strategy.restrict(kinds);

        for &kind in &kinds {
            match kind {
                EntityKind::Item => append_items(store, db, &mut pass, &mut report),
                EntityKind::Recipe => append_recipes(store, db, &mut pass, &mut report),
                EntityKind::StatusEffect => {
                    append_status_effects(store, db, &mut pass, &mut report)
                }
                _ => {}
            }
            db.rebuild_index();
        }

        for &kind in &kinds {
            match kind {
                EntityKind::Item => fixup_items(store, db, &pass, &pending, &mut report),
                EntityKind::Recipe => fixup_recipes(store, db, &pass, &pending, &mut report),
                EntityKind::StatusEffect => {
                    fixup_status_effects(store, db, &pass, &pending, &mut report)
                }
                _ => {}
            }
        }

        log::info!(
            "resolution pass over {kinds:?}: {} added, {} already present, {} failed",
            report.added,
            report.already_present,
            report.failed
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Append stage (required references only)
// ---------------------------------------------------------------------------

/// Resolve a token the declaration cannot be appended without. On a conflict
/// the previous resolution is kept and used; the conflict is logged loudly
/// because it almost always indicates an extension bug.
fn resolve_required(
    token: &mut MockRef,
    chain: &PassLookup<'_>,
    generation: Generation,
    decl_kind: EntityKind,
    decl_name: &str,
    source: &ExtensionInfo,
    report: &mut ResolutionReport,
) -> Option<EntityHandle> {
    match token.resolve(generation, chain) {
        Ok(handle) => Some(handle),
        Err(MockError::NotFound { name, .. }) => {
            report.record_failure(decl_kind, decl_name, &name, source);
            None
        }
        Err(err @ MockError::Conflict { .. }) => {
            log::error!("while resolving {decl_kind:?} {decl_name:?}: {err}");
            let kept = token.handle_for(generation);
            if kept.is_none() {
                report.record_failure(decl_kind, decl_name, token.name(), source);
            }
            kept
        }
    }
}

fn append_items(
    store: &mut PendingStore,
    db: &mut dyn HostDatabase,
    pass: &mut Pass,
    report: &mut ResolutionReport,
) {
    let generation = pass.generation;
    for (idx, item) in store.items_mut().iter_mut().enumerate() {
        let idx = idx as u32;
        if let Some(existing) = db.find(EntityKind::Item, &item.name) {
            pass.record(EntityKind::Item, idx, &item.name, existing);
            report.already_present += 1;
            continue;
        }

        let chain = PassLookup::appended_only(&*db, &pass.by_name);
        let Some(handle) = resolve_required(
            &mut item.prefab,
            &chain,
            generation,
            EntityKind::Item,
            &item.name,
            &item.source,
            report,
        ) else {
            continue;
        };
        let Some(prefab_key) = pass.to_key(handle) else {
            report.record_failure(EntityKind::Item, &item.name, item.prefab.name(), &item.source);
            continue;
        };

        let key = db.insert(HostEntity::Item(ItemEntity {
            name: item.name.clone(),
            token: item.token.clone(),
            prefab: prefab_key,
            drop_prefab: None,
            equip_effect: None,
        }));
        pass.record(EntityKind::Item, idx, &item.name, key);
        // A freshly inserted record carries unpatched links, even if an
        // earlier generation already fixed this declaration once.
        item.fix_references = true;
        report.added += 1;
        log::info!("added custom item {:?} (token {:?})", item.name, item.token);
    }
}

fn append_recipes(
    store: &mut PendingStore,
    db: &mut dyn HostDatabase,
    pass: &mut Pass,
    report: &mut ResolutionReport,
) {
    let generation = pass.generation;
    for (idx, recipe) in store.recipes_mut().iter_mut().enumerate() {
        let idx = idx as u32;
        if let Some(existing) = db.find(EntityKind::Recipe, &recipe.name) {
            pass.record(EntityKind::Recipe, idx, &recipe.name, existing);
            report.already_present += 1;
            continue;
        }

        let chain = PassLookup::appended_only(&*db, &pass.by_name);
        let Some(result_handle) = resolve_required(
            &mut recipe.result,
            &chain,
            generation,
            EntityKind::Recipe,
            &recipe.name,
            &recipe.source,
            report,
        ) else {
            continue;
        };
        let crafting_handle = match recipe.crafting_station.as_mut() {
            None => None,
            Some(token) => match resolve_required(
                token,
                &chain,
                generation,
                EntityKind::Recipe,
                &recipe.name,
                &recipe.source,
                report,
            ) {
                Some(handle) => Some(handle),
                None => continue,
            },
        };
        let repair_handle = match recipe.repair_station.as_mut() {
            None => None,
            Some(token) => match resolve_required(
                token,
                &chain,
                generation,
                EntityKind::Recipe,
                &recipe.name,
                &recipe.source,
                report,
            ) {
                Some(handle) => Some(handle),
                None => continue,
            },
        };

        let Some(result_key) = pass.to_key(result_handle) else {
            report.record_failure(
                EntityKind::Recipe,
                &recipe.name,
                recipe.result.name(),
                &recipe.source,
            );
            continue;
        };
        // Stations only exist in the host database, so these translations
        // cannot miss; handled anyway for uniformity.
        let crafting_station = crafting_handle.and_then(|h| pass.to_key(h));
        let repair_station = repair_handle.and_then(|h| pass.to_key(h));

        let key = db.insert(HostEntity::Recipe(RecipeEntity {
            name: recipe.name.clone(),
            result: result_key,
            amount: recipe.amount,
            enabled: recipe.enabled,
            crafting_station,
            repair_station,
            min_station_level: recipe.min_station_level,
            requirements: recipe
                .requirements
                .iter()
                .map(|r| RequirementEntity {
                    item: None,
                    amount: r.amount,
                    per_level: r.per_level,
                })
                .collect(),
        }));
        pass.record(EntityKind::Recipe, idx, &recipe.name, key);
        recipe.fix_requirement_references = true;
        report.added += 1;
        log::info!("added custom recipe {:?}", recipe.name);
    }
}

fn append_status_effects(
    store: &mut PendingStore,
    db: &mut dyn HostDatabase,
    pass: &mut Pass,
    report: &mut ResolutionReport,
) {
    for (idx, effect) in store.status_effects_mut().iter_mut().enumerate() {
        let idx = idx as u32;
        if let Some(existing) = db.find(EntityKind::StatusEffect, &effect.name) {
            pass.record(EntityKind::StatusEffect, idx, &effect.name, existing);
            report.already_present += 1;
            continue;
        }

        let key = db.insert(HostEntity::StatusEffect(StatusEffectEntity {
            name: effect.name.clone(),
            category: effect.category.clone(),
            icon_item: None,
        }));
        pass.record(EntityKind::StatusEffect, idx, &effect.name, key);
        effect.fix_references = true;
        report.added += 1;
        log::info!("added custom status effect {:?}", effect.name);
    }
}

// ---------------------------------------------------------------------------
// Fixup stage (second-order links)
// ---------------------------------------------------------------------------

/// Resolve one optional link on an appended declaration. Returns the key to
/// write, or `None` when the link is absent, deferred, or broken. Deferred
/// links (the target is a pending declaration outside this cycle's kinds)
/// clear `complete` without reporting; names found nowhere are reported.
#[allow(clippy::too_many_arguments)]
fn fixup_link(
    token: Option<&mut MockRef>,
    chain: &PassLookup<'_>,
    pass: &Pass,
    decl_kind: EntityKind,
    decl_name: &str,
    source: &ExtensionInfo,
    report: &mut ResolutionReport,
    complete: &mut bool,
) -> Option<EntityKey> {
    let token = token?;
    match token.resolve(pass.generation, chain) {
        Ok(handle) => match pass.to_key(handle) {
            Some(key) => Some(key),
            None => {
                log::debug!(
                    "deferring link {:?} on {decl_kind:?} {decl_name:?} to a later cycle",
                    token.name()
                );
                *complete = false;
                None
            }
        },
        Err(MockError::NotFound { name, .. }) => {
            report.record_failure(decl_kind, decl_name, &name, source);
            *complete = false;
            None
        }
        Err(err @ MockError::Conflict { .. }) => {
            log::error!("while fixing references on {decl_kind:?} {decl_name:?}: {err}");
            match token.handle_for(pass.generation).and_then(|h| pass.to_key(h)) {
                Some(key) => Some(key),
                None => {
                    *complete = false;
                    None
                }
            }
        }
    }
}

fn fixup_items(
    store: &mut PendingStore,
    db: &mut dyn HostDatabase,
    pass: &Pass,
    pending: &PendingIndex,
    report: &mut ResolutionReport,
) {
    for (idx, item) in store.items_mut().iter_mut().enumerate() {
        if !item.fix_references {
            continue;
        }
        let Some(&key) = pass.by_index.get(&(EntityKind::Item, idx as u32)) else {
            continue;
        };

        let mut complete = true;
        let chain = PassLookup::with_pending(&*db, &pass.by_name, pending);
        let drop_key = fixup_link(
            item.drop_prefab.as_mut(),
            &chain,
            pass,
            EntityKind::Item,
            &item.name,
            &item.source,
            report,
            &mut complete,
        );
        let effect_key = fixup_link(
            item.equip_effect.as_mut(),
            &chain,
            pass,
            EntityKind::Item,
            &item.name,
            &item.source,
            report,
            &mut complete,
        );

        if drop_key.is_some() || effect_key.is_some() {
            if let Some(HostEntity::Item(entry)) = db.entity_mut(key) {
                if drop_key.is_some() {
                    entry.drop_prefab = drop_key;
                }
                if effect_key.is_some() {
                    entry.equip_effect = effect_key;
                }
            }
        }
        if complete {
            item.fix_references = false;
        }
    }
}

fn fixup_recipes(
    store: &mut PendingStore,
    db: &mut dyn HostDatabase,
    pass: &Pass,
    pending: &PendingIndex,
    report: &mut ResolutionReport,
) {
    for (idx, recipe) in store.recipes_mut().iter_mut().enumerate() {
        if !recipe.fix_requirement_references {
            continue;
        }
        let Some(&key) = pass.by_index.get(&(EntityKind::Recipe, idx as u32)) else {
            continue;
        };

        let mut complete = true;
        let chain = PassLookup::with_pending(&*db, &pass.by_name, pending);
        let req_keys: Vec<Option<EntityKey>> = recipe
            .requirements
            .iter_mut()
            .map(|req| {
                fixup_link(
                    Some(&mut req.item),
                    &chain,
                    pass,
                    EntityKind::Recipe,
                    &recipe.name,
                    &recipe.source,
                    report,
                    &mut complete,
                )
            })
            .collect();

        if req_keys.iter().any(Option::is_some) {
            if let Some(HostEntity::Recipe(entry)) = db.entity_mut(key) {
                for (slot, req_key) in entry.requirements.iter_mut().zip(req_keys) {
                    if req_key.is_some() {
                        slot.item = req_key;
                    }
                }
            }
        }
        if complete {
            recipe.fix_requirement_references = false;
        }
    }
}

fn fixup_status_effects(
    store: &mut PendingStore,
    db: &mut dyn HostDatabase,
    pass: &Pass,
    pending: &PendingIndex,
    report: &mut ResolutionReport,
) {
    for (idx, effect) in store.status_effects_mut().iter_mut().enumerate() {
        if !effect.fix_references {
            continue;
        }
        let Some(&key) = pass.by_index.get(&(EntityKind::StatusEffect, idx as u32)) else {
            continue;
        };

        let mut complete = true;
        let chain = PassLookup::with_pending(&*db, &pass.by_name, pending);
        let icon_key = fixup_link(
            effect.icon_item.as_mut(),
            &chain,
            pass,
            EntityKind::StatusEffect,
            &effect.name,
            &effect.source,
            report,
            &mut complete,
        );

        if icon_key.is_some() {
            if let Some(HostEntity::StatusEffect(entry)) = db.entity_mut(key) {
                entry.icon_item = icon_key;
            }
        }
        if complete {
            effect.fix_references = false;
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
