#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::entity::Component;

/// Base stats of a chassis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChassisStats {
    pub structure_pts: u32,
    pub energy_pts: u32,
    pub heat_cap: u32,
    pub system_slots: u32,
    pub module_slots: u32,
    pub tech_level: u8,
    pub salvage_value: u32,
}

/// Preset loadout shipped with a chassis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChassisPattern {
    pub name: String,
    #[serde(default)]
    pub systems: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Mech chassis with its preset patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogChassis {
    pub name: String,
    pub stats: ChassisStats,
    #[serde(default)]
    pub patterns: Vec<ChassisPattern>,
}

impl CatalogChassis {
    pub fn pattern_names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|pattern| pattern.name.as_str())
    }
}

/// Attributes of a system or module as stored in the catalog tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentData {
    pub tech_level: u8,
    #[serde(default)]
    pub slots_required: u32,
    #[serde(default)]
    pub salvage_value: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named system or module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogComponent {
    pub name: String,
    pub data: ComponentData,
}

impl CatalogComponent {
    pub fn tech_level(&self) -> u8 {
        self.data.tech_level
    }

    pub fn slots_required(&self) -> u32 {
        self.data.slots_required
    }

    pub fn salvage_value(&self) -> u32 {
        self.data.salvage_value
    }
}

/// Ability carried by an other-entity template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
}

/// Non-mech unit template (bio-titan, NPC, vehicle...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherEntityTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_pts: Option<u32>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub systems: Vec<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Group of other-entity templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCategory {
    pub category: String,
    #[serde(default)]
    pub entities: Vec<OtherEntityTemplate>,
}
