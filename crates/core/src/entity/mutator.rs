use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::Catalog,
    error::{SlotKind, TrackerError},
    ids::IdGenerator,
    loadout::Loadout,
};

use super::{
    factory::MapBounds,
    models::{Component, ComponentKind, Entity, Pilot, Position, Stat},
};

/// Single field overwrite requested by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
    Name(String),
    Description(Option<String>),
    /// Current value of a stat; clamped into `[0, max]`.
    Current(Stat, i64),
    /// Maximum of a stat; current is pulled down when it exceeds the new max.
    Max(Stat, u32),
}

/// Partial pilot edit. Max values are applied before current values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hp: Option<i64>,
    #[serde(default)]
    pub max_hp: Option<u32>,
    #[serde(default)]
    pub ap: Option<i64>,
    #[serde(default)]
    pub max_ap: Option<u32>,
}

impl PilotPatch {
    fn apply(&self, pilot: &mut Pilot) {
        if let Some(name) = &self.name {
            pilot.name = name.clone();
        }
        if let Some(max) = self.max_hp {
            pilot.hp.set_max(max);
        }
        if let Some(max) = self.max_ap {
            pilot.ap.set_max(max);
        }
        if let Some(hp) = self.hp {
            pilot.hp.set_current(hp);
        }
        if let Some(ap) = self.ap {
            pilot.ap.set_current(ap);
        }
    }
}

impl Entity {
    /// Apply a field overwrite. Returns `false` when the entity does not track
    /// the addressed stat.
    pub fn set_field(&mut self, update: FieldUpdate) -> bool {
        match update {
            FieldUpdate::Name(name) => self.name = name,
            FieldUpdate::Description(description) => self.description = description,
            FieldUpdate::Current(stat, value) => match self.gauge_mut(stat) {
                Some(gauge) => gauge.set_current(value),
                None => return false,
            },
            FieldUpdate::Max(stat, max) => match self.gauge_mut(stat) {
                Some(gauge) => gauge.set_max(max),
                None => return false,
            },
        }
        true
    }

    pub fn toggle_acted(&mut self) {
        self.has_acted = !self.has_acted;
    }

    pub fn toggle_disabled(&mut self) {
        self.is_disabled = !self.is_disabled;
    }

    pub fn cycle_group_color(&mut self) {
        self.group_color = self.group_color.next();
    }

    pub fn move_to(&mut self, position: Position) {
        self.position = Some(position);
    }

    /// Advance the condition of one component. Out-of-range indices are ignored.
    pub fn cycle_condition(&mut self, kind: ComponentKind, index: usize) -> bool {
        match self.components_mut(kind).get_mut(index) {
            Some(component) => {
                component.condition = component.condition.next();
                true
            }
            None => {
                debug!(id = %self.id, ?kind, index, "Condition cycle ignored: no such component");
                false
            }
        }
    }

    pub fn add_pilot(&mut self) {
        self.pilots.push(Pilot::default());
    }

    pub fn update_pilot(&mut self, index: usize, patch: &PilotPatch) -> bool {
        match self.pilots.get_mut(index) {
            Some(pilot) => {
                patch.apply(pilot);
                true
            }
            None => false,
        }
    }

    pub fn remove_pilot(&mut self, index: usize) -> bool {
        if index < self.pilots.len() {
            self.pilots.remove(index);
            true
        } else {
            false
        }
    }

    /// Slot usage and salvage totals of the attached systems and modules.
    pub fn loadout(&self, catalog: &Catalog) -> Loadout {
        let chassis = self
            .chassis
            .as_deref()
            .and_then(|name| catalog.chassis(name).ok())
            .map(|chassis| &chassis.stats);
        Loadout::compute(
            catalog,
            chassis,
            self.systems.iter().map(|c| c.name.as_str()),
            self.modules.iter().map(|c| c.name.as_str()),
        )
    }

    /// Attach a catalog system or module, enforcing the slot capacity when known.
    pub fn attach_component(
        &mut self,
        catalog: &Catalog,
        slot: SlotKind,
        name: &str,
    ) -> Result<(), TrackerError> {
        let component = catalog.component(slot, name)?;
        let capacity = match slot {
            SlotKind::System => self.system_slots,
            SlotKind::Module => self.module_slots,
        };
        if let Some(capacity) = capacity {
            self.loadout(catalog)
                .ensure_fits(slot, component.slots_required(), capacity)?;
        }
        self.components_mut(slot_list(slot))
            .push(Component::new(component.name.clone()));
        Ok(())
    }

    pub fn detach_component(&mut self, kind: ComponentKind, index: usize) -> Option<Component> {
        let list = self.components_mut(kind);
        (index < list.len()).then(|| list.remove(index))
    }
}

fn slot_list(slot: SlotKind) -> ComponentKind {
    match slot {
        SlotKind::System => ComponentKind::System,
        SlotKind::Module => ComponentKind::Module,
    }
}

static COPY_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\((\d+)\)$").expect("failed to compile copy suffix regex"));

/// Strip a trailing ` (<n>)` copy counter.
pub fn base_name(name: &str) -> &str {
    COPY_SUFFIX_RE
        .captures(name)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .unwrap_or(name)
}

/// `"<base> (<n>)"` with the smallest `n >= 1` not already taken by a name
/// sharing the same base.
pub fn duplicate_name<'a>(name: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let base = base_name(name);
    let used: BTreeSet<u32> = existing
        .into_iter()
        .filter(|candidate| base_name(candidate) == base)
        .filter_map(|candidate| {
            COPY_SUFFIX_RE
                .captures(candidate)
                .and_then(|cap| cap.get(2))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        })
        .collect();
    let next = (1..).find(|n| !used.contains(n)).unwrap_or(1);
    format!("{base} ({next})")
}

/// Clone `entity` under a fresh id, a fresh map position and the next free copy name.
pub fn duplicate_entity<'a>(
    entity: &Entity,
    existing_names: impl IntoIterator<Item = &'a str>,
    ids: &mut IdGenerator,
    bounds: MapBounds,
) -> Entity {
    let mut copy = entity.clone();
    copy.id = ids.entity();
    copy.name = duplicate_name(&entity.name, existing_names);
    copy.position = Some(bounds.random_position(&mut rand::thread_rng()));
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Condition, EntityKind, Gauge};
    use crate::error::LookupKind;
    use crate::ids::EntityId;

    fn mech() -> Entity {
        let mut entity = Entity::new(EntityId(1), "Scout", EntityKind::Mech);
        entity.sp = Some(Gauge::full(8));
        entity.ep = Some(Gauge::full(4));
        entity.heat = Some(Gauge::empty(6));
        entity.systems = vec![Component::new("Vibro Blade")];
        entity
    }

    #[test]
    fn stat_updates_stay_in_range() {
        let mut entity = mech();
        assert!(entity.set_field(FieldUpdate::Current(Stat::Sp, 20)));
        assert_eq!(entity.sp.map(|g| g.current()), Some(8));
        entity.set_field(FieldUpdate::Current(Stat::Heat, -2));
        assert_eq!(entity.heat.map(|g| g.current()), Some(0));

        entity.set_field(FieldUpdate::Max(Stat::Sp, 5));
        assert_eq!(entity.sp.map(|g| (g.current(), g.max())), Some((5, 5)));
        entity.set_field(FieldUpdate::Max(Stat::Sp, 12));
        assert_eq!(entity.sp.map(|g| (g.current(), g.max())), Some((5, 12)));

        assert!(!entity.set_field(FieldUpdate::Current(Stat::Hp, 3)));
        assert!(entity.hp.is_none());
    }

    #[test]
    fn condition_cycle_has_period_three() {
        let mut entity = mech();
        let seen: Vec<Condition> = (0..3)
            .map(|_| {
                entity.cycle_condition(ComponentKind::System, 0);
                entity.systems[0].condition
            })
            .collect();
        assert_eq!(
            seen,
            vec![Condition::Damaged, Condition::Destroyed, Condition::Normal]
        );
        assert!(!entity.cycle_condition(ComponentKind::Module, 0));
    }

    #[test]
    fn pilot_edits_are_bounds_checked() {
        let mut entity = mech();
        entity.add_pilot();
        let patch = PilotPatch {
            name: Some("Rook".to_string()),
            max_hp: Some(6),
            hp: Some(9),
            ..PilotPatch::default()
        };
        assert!(entity.update_pilot(0, &patch));
        assert_eq!(entity.pilots[0].name, "Rook");
        assert_eq!(entity.pilots[0].hp.current(), 6);
        assert_eq!(entity.pilots[0].ap.current(), 5);

        assert!(!entity.update_pilot(3, &patch));
        assert!(!entity.remove_pilot(1));
        assert!(entity.remove_pilot(0));
        assert!(entity.pilots.is_empty());
    }

    #[test]
    fn attaching_respects_slot_capacity() {
        let catalog = Catalog::bundled().expect("bundled catalog parses");
        let mut entity = mech();
        entity.system_slots = Some(3);

        entity
            .attach_component(&catalog, SlotKind::System, "Light Machine Gun")
            .expect("1 + 2 fits in 3");
        let before = entity.systems.clone();
        let err = entity
            .attach_component(&catalog, SlotKind::System, "Vibro Blade")
            .unwrap_err();
        assert_eq!(
            err,
            TrackerError::OutOfBudget {
                slot: SlotKind::System,
                required: 1,
                used: 3,
                capacity: 3,
            }
        );
        assert_eq!(entity.systems, before);

        let err = entity
            .attach_component(&catalog, SlotKind::Module, "Warp Core")
            .unwrap_err();
        assert_eq!(err, TrackerError::not_found(LookupKind::Module, "Warp Core"));

        let removed = entity.detach_component(ComponentKind::System, 0);
        assert_eq!(removed.map(|c| c.name), Some("Vibro Blade".to_string()));
        assert!(entity.detach_component(ComponentKind::System, 5).is_none());
    }

    #[test]
    fn duplicate_names_fill_the_first_gap() {
        assert_eq!(duplicate_name("Scout", ["Scout", "Scout (1)"]), "Scout (2)");
        assert_eq!(
            duplicate_name("Scout (2)", ["Scout", "Scout (1)", "Scout (2)"]),
            "Scout (3)"
        );
        assert_eq!(
            duplicate_name("Scout", ["Scout", "Scout (2)", "Scouting Party (1)"]),
            "Scout (1)"
        );
        assert_eq!(base_name("Mule - Hauler (12)"), "Mule - Hauler");
    }

    #[test]
    fn duplicate_gets_new_identity() {
        let mut ids = IdGenerator::starting_after(10);
        let mut original = mech();
        original.add_pilot();
        original.has_acted = true;

        let copy = duplicate_entity(&original, ["Scout"], &mut ids, MapBounds::default());
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Scout (1)");
        assert_eq!(copy.pilots, original.pilots);
        assert!(copy.position.is_some());
    }
}
