//! Modlink Core -- deferred content registration for extension ecosystems.
//!
//! Extensions declare items, recipes, and status effects by name long before
//! the host application has built its authoritative entity database. Every
//! cross-reference (an item's prefab, a recipe's result, a requirement's
//! ingredient) is carried as a [`mock::MockRef`] token and resolved later, at
//! host-defined lifecycle points, exactly once per cycle and idempotently
//! across repeated database rebuilds.
//!
//! # Resolution Cycle
//!
//! A cycle walks pending declarations kind by kind (items, then recipes,
//! then status effects) and in registration order within each kind:
//!
//! 1. **Identity check** -- declarations already present in the database are
//!    counted and skipped, which makes replays after a rebuild safe.
//! 2. **Required references** -- resolved through a chained lookup (host
//!    index, then entities appended earlier in the same pass); a miss rejects
//!    only that declaration, never the batch.
//! 3. **Append** -- the declaration becomes a host-native record.
//! 4. **Reindex** -- the host's derived name index is rebuilt once per kind
//!    batch, never mid-batch.
//! 5. **Fixup** -- second-order links (drop prefabs, equip effects,
//!    requirement items, effect icons) are patched into the appended records,
//!    guarded by per-declaration flags that clear only on full success so
//!    partially linkable declarations retry on a later cycle.
//!
//! # Key Types
//!
//! - [`pipeline::ContentPipeline`] -- The facade: registration, lifecycle
//!   subscriptions, and the host glue entry points.
//! - [`mock::MockRef`] -- A `(kind, name)` reference token with a
//!   write-once-per-generation resolved slot.
//! - [`store::PendingStore`] -- Append-only, insertion-ordered, deduplicating
//!   collections of pending declarations.
//! - [`resolver::Resolver`] -- The kind-ordered resolution engine and its
//!   [`resolver::ResolutionReport`].
//! - [`lifecycle::LifecycleCoordinator`] -- Maps host lifecycle events to
//!   passes and delivers observer notifications with panic isolation.
//! - [`host::HostDatabase`] -- The trait boundary to the host application's
//!   entity database.
//! - [`hooks::LifecycleHook`] -- Before/after stage lists that always run
//!   around, never instead of, original host behavior.

#[cfg(feature = "config-loader")]
pub mod config;
pub mod entity;
pub mod hooks;
pub mod host;
pub mod id;
pub mod lifecycle;
pub mod mock;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
