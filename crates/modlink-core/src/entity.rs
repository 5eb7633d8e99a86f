//! Declarations submitted by extensions before the host database exists.
//!
//! A declaration is created at any point after process start and is immutable
//! afterwards, with two exceptions: the resolver writes resolved handles into
//! its [`MockRef`] slots, and clears the `fix_references` guards once every
//! second-order link on the declaration has been patched.

use crate::id::EntityKind;
use crate::mock::MockRef;

/// Identity of the extension that registered a declaration. Carried through
/// resolution so failures can be attributed to their source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub guid: String,
    pub name: String,
    pub version: String,
}

impl ExtensionInfo {
    pub fn new(
        guid: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

/// A custom item declaration.
///
/// `prefab` is required and must resolve before the item is appended. The
/// `drop_prefab` and `equip_effect` links are second-order: they are patched
/// by the guarded fixup pass after the batch has been appended, and may stay
/// deferred across cycles (an items-only cycle cannot link a status effect
/// that has not been appended yet).
#[derive(Debug, Clone)]
pub struct CustomItem {
    /// Internal name, also the item's identity in the host database.
    pub name: String,
    /// Display token shown by the host's localization layer.
    pub token: String,
    pub prefab: MockRef,
    pub drop_prefab: Option<MockRef>,
    pub equip_effect: Option<MockRef>,
    /// Cleared by the resolver once all second-order links resolved.
    pub fix_references: bool,
    pub source: ExtensionInfo,
}

impl CustomItem {
    pub fn new(name: impl Into<String>, prefab: impl Into<String>, source: ExtensionInfo) -> Self {
        let name = name.into();
        Self {
            token: format!("${name}"),
            name,
            prefab: MockRef::new(EntityKind::Prefab, prefab),
            drop_prefab: None,
            equip_effect: None,
            fix_references: true,
            source,
        }
    }
}

/// A resource requirement inside a recipe, referencing an item by name.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub item: MockRef,
    pub amount: u32,
    /// Additional amount required per upgrade level.
    pub per_level: u32,
}

impl Requirement {
    pub fn new(item: impl Into<String>, amount: u32) -> Self {
        Self {
            item: MockRef::new(EntityKind::Item, item),
            amount,
            per_level: 0,
        }
    }
}

/// A custom recipe declaration.
///
/// `result` must resolve before the recipe is appended; so must the crafting
/// and repair stations when present. The requirement list is second-order and
/// guarded by `fix_requirement_references`.
#[derive(Debug, Clone)]
pub struct CustomRecipe {
    pub name: String,
    pub result: MockRef,
    pub amount: u32,
    pub enabled: bool,
    pub crafting_station: Option<MockRef>,
    /// Deliberately a separate field from `crafting_station`; declarations
    /// can name either or both.
    pub repair_station: Option<MockRef>,
    pub min_station_level: u32,
    pub requirements: Vec<Requirement>,
    /// Cleared by the resolver once all requirement links resolved.
    pub fix_requirement_references: bool,
    pub source: ExtensionInfo,
}

impl CustomRecipe {
    pub fn new(name: impl Into<String>, result: impl Into<String>, source: ExtensionInfo) -> Self {
        Self {
            name: name.into(),
            result: MockRef::new(EntityKind::Item, result),
            amount: 1,
            enabled: true,
            crafting_station: None,
            repair_station: None,
            min_station_level: 0,
            requirements: Vec::new(),
            fix_requirement_references: true,
            source,
        }
    }
}

/// A custom status effect declaration. The icon link is second-order.
#[derive(Debug, Clone)]
pub struct CustomStatusEffect {
    pub name: String,
    pub category: String,
    pub icon_item: Option<MockRef>,
    /// Cleared by the resolver once the icon link resolved.
    pub fix_references: bool,
    pub source: ExtensionInfo,
}

impl CustomStatusEffect {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        source: ExtensionInfo,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            icon_item: None,
            fix_references: true,
            source,
        }
    }
}
