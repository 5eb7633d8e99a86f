//! JSON config ingestion, gated behind the `config-loader` feature.
//!
//! A thin deserialization layer: already-validated JSON records in,
//! declarations with mock references out. Extensions that ship content as
//! data files parse them here and hand the results to the pipeline; nothing
//! in the core resolution path depends on this module.

use crate::entity::{CustomItem, CustomRecipe, CustomStatusEffect, ExtensionInfo, Requirement};
use crate::id::EntityKind;
use crate::mock::MockRef;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn default_amount() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemConfig {
    pub name: String,
    /// Name of the prefab the item wraps.
    pub prefab: String,
    /// Display token; defaults to `$name`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub drop_prefab: Option<String>,
    #[serde(default)]
    pub equip_effect: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementConfig {
    pub item: String,
    #[serde(default = "default_amount")]
    pub amount: u32,
    #[serde(default)]
    pub amount_per_level: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeConfig {
    pub name: String,
    /// Name of the item the recipe produces.
    pub item: String,
    #[serde(default = "default_amount")]
    pub amount: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub crafting_station: Option<String>,
    /// Distinct from `crafting_station`; a recipe can name either or both.
    #[serde(default)]
    pub repair_station: Option<String>,
    #[serde(default)]
    pub min_station_level: u32,
    #[serde(default)]
    pub requirements: Vec<RequirementConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusEffectConfig {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub icon_item: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing and conversion
// ---------------------------------------------------------------------------

impl ItemConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn list_from_json(text: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_declaration(self, source: ExtensionInfo) -> CustomItem {
        let mut item = CustomItem::new(self.name, self.prefab, source);
        if let Some(token) = self.token {
            item.token = token;
        }
        item.drop_prefab = self
            .drop_prefab
            .map(|name| MockRef::new(EntityKind::Item, name));
        item.equip_effect = self
            .equip_effect
            .map(|name| MockRef::new(EntityKind::StatusEffect, name));
        item
    }
}

impl RequirementConfig {
    fn into_requirement(self) -> Requirement {
        let mut requirement = Requirement::new(self.item, self.amount);
        requirement.per_level = self.amount_per_level;
        requirement
    }
}

impl RecipeConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn list_from_json(text: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_declaration(self, source: ExtensionInfo) -> CustomRecipe {
        let mut recipe = CustomRecipe::new(self.name, self.item, source);
        recipe.amount = self.amount;
        recipe.enabled = self.enabled;
        recipe.crafting_station = self
            .crafting_station
            .map(|name| MockRef::new(EntityKind::Station, name));
        recipe.repair_station = self
            .repair_station
            .map(|name| MockRef::new(EntityKind::Station, name));
        recipe.min_station_level = self.min_station_level;
        recipe.requirements = self
            .requirements
            .into_iter()
            .map(RequirementConfig::into_requirement)
            .collect();
        recipe
    }
}

impl StatusEffectConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn list_from_json(text: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_declaration(self, source: ExtensionInfo) -> CustomStatusEffect {
        let mut effect = CustomStatusEffect::new(self.name, self.category, source);
        effect.icon_item = self
            .icon_item
            .map(|name| MockRef::new(EntityKind::Item, name));
        effect
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ExtensionInfo {
        ExtensionInfo::new("com.example.configmod", "ConfigMod", "1.0.0")
    }

    #[test]
    fn item_config_minimal() {
        let item = ItemConfig::from_json(r#"{ "name": "obsidian_knife", "prefab": "knife_prefab" }"#)
            .unwrap()
            .into_declaration(source());
        assert_eq!(item.token, "$obsidian_knife");
        assert!(item.drop_prefab.is_none());
        assert!(item.fix_references);
    }

    #[test]
    fn recipe_config_with_both_stations() {
        let recipe = RecipeConfig::from_json(
            r#"{
                "name": "Recipe_obsidian_knife",
                "item": "obsidian_knife",
                "crafting_station": "forge",
                "repair_station": "workbench",
                "min_station_level": 2,
                "requirements": [
                    { "item": "wood", "amount": 4 },
                    { "item": "obsidian", "amount": 2, "amount_per_level": 1 }
                ]
            }"#,
        )
        .unwrap()
        .into_declaration(source());

        let crafting = recipe.crafting_station.unwrap();
        let repair = recipe.repair_station.unwrap();
        assert_eq!(crafting.name(), "forge");
        assert_eq!(repair.name(), "workbench");
        assert_ne!(crafting, repair);

        assert_eq!(recipe.amount, 1);
        assert!(recipe.enabled);
        assert_eq!(recipe.requirements.len(), 2);
        assert_eq!(recipe.requirements[1].per_level, 1);
    }

    #[test]
    fn recipe_list_preserves_order() {
        let recipes = RecipeConfig::list_from_json(
            r#"[
                { "name": "Recipe_b", "item": "b" },
                { "name": "Recipe_a", "item": "a" }
            ]"#,
        )
        .unwrap();
        let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Recipe_b", "Recipe_a"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = StatusEffectConfig::from_json(
            r#"{ "name": "haste", "category": "buff", "icon": "oops" }"#,
        );
        assert!(matches!(err, Err(ConfigError::Malformed(_))));
    }
}
