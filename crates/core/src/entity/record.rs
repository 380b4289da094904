//! Stored shape of entities and pilots: camelCase keys, a `type` tag and flat
//! `sp`/`maxSp` style stat pairs.

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, PatternId};

use super::models::{Component, Entity, EntityKind, Gauge, GroupColor, Pilot, Position};

fn current_of(gauge: Option<Gauge>) -> Option<i64> {
    gauge.map(|g| i64::from(g.current()))
}

fn max_of(gauge: Option<Gauge>) -> Option<i64> {
    gauge.map(|g| i64::from(g.max()))
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PilotRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    hp: Option<i64>,
    #[serde(default)]
    max_hp: Option<i64>,
    #[serde(default)]
    ap: Option<i64>,
    #[serde(default)]
    max_ap: Option<i64>,
}

impl From<PilotRecord> for Pilot {
    fn from(record: PilotRecord) -> Self {
        let defaults = Pilot::default();
        Self {
            name: record.name.unwrap_or(defaults.name),
            hp: Gauge::from_pair(record.hp, record.max_hp).unwrap_or(defaults.hp),
            ap: Gauge::from_pair(record.ap, record.max_ap).unwrap_or(defaults.ap),
        }
    }
}

impl From<Pilot> for PilotRecord {
    fn from(pilot: Pilot) -> Self {
        Self {
            name: Some(pilot.name),
            hp: current_of(Some(pilot.hp)),
            max_hp: max_of(Some(pilot.hp)),
            ap: current_of(Some(pilot.ap)),
            max_ap: max_of(Some(pilot.ap)),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntityRecord {
    id: EntityId,
    name: String,
    #[serde(rename = "type")]
    kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chassis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern_id: Option<PatternId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_sp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ep: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_ep: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_heat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_hp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_slots: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    module_slots: Option<u32>,
    #[serde(default)]
    pilots: Vec<Pilot>,
    #[serde(default)]
    systems: Vec<Component>,
    #[serde(default)]
    modules: Vec<Component>,
    #[serde(default)]
    abilities: Vec<Component>,
    #[serde(default)]
    has_acted: bool,
    #[serde(default)]
    is_disabled: bool,
    #[serde(default)]
    group_color: GroupColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
}

impl From<EntityRecord> for Entity {
    fn from(record: EntityRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            kind: record.kind,
            category: record.category,
            description: record.description,
            chassis: record.chassis,
            pattern_id: record.pattern_id,
            sp: Gauge::from_pair(record.sp, record.max_sp),
            ep: Gauge::from_pair(record.ep, record.max_ep),
            heat: Gauge::from_pair(record.heat, record.max_heat),
            hp: Gauge::from_pair(record.hp, record.max_hp),
            system_slots: record.system_slots,
            module_slots: record.module_slots,
            pilots: record.pilots,
            systems: record.systems,
            modules: record.modules,
            abilities: record.abilities,
            has_acted: record.has_acted,
            is_disabled: record.is_disabled,
            group_color: record.group_color,
            position: record.position,
        }
    }
}

impl From<Entity> for EntityRecord {
    fn from(entity: Entity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            kind: entity.kind,
            category: entity.category,
            description: entity.description,
            chassis: entity.chassis,
            pattern_id: entity.pattern_id,
            sp: current_of(entity.sp),
            max_sp: max_of(entity.sp),
            ep: current_of(entity.ep),
            max_ep: max_of(entity.ep),
            heat: current_of(entity.heat),
            max_heat: max_of(entity.heat),
            hp: current_of(entity.hp),
            max_hp: max_of(entity.hp),
            system_slots: entity.system_slots,
            module_slots: entity.module_slots,
            pilots: entity.pilots,
            systems: entity.systems,
            modules: entity.modules,
            abilities: entity.abilities,
            has_acted: entity.has_acted,
            is_disabled: entity.is_disabled,
            group_color: entity.group_color,
            position: entity.position,
        }
    }
}
