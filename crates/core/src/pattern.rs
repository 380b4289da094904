#![allow(missing_docs)]

//! Saved custom mech patterns and propagation of pattern edits to live entities.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    entity::{Component, Entity, Gauge},
    error::{LookupKind, TrackerError},
    ids::{IdGenerator, PatternId},
};

/// Stat snapshot cached on a pattern when it is saved from the builder.
///
/// Stored flat on the pattern record (`sp`, `maxSp`, `systemSlots`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternStats {
    pub sp: u32,
    pub max_sp: u32,
    pub ep: u32,
    pub max_ep: u32,
    pub heat: u32,
    pub max_heat: u32,
    pub system_slots: u32,
    pub module_slots: u32,
}

impl PatternStats {
    pub(crate) fn sp_gauge(&self) -> Gauge {
        Gauge::with_current(i64::from(self.sp), self.max_sp)
    }

    pub(crate) fn ep_gauge(&self) -> Gauge {
        Gauge::with_current(i64::from(self.ep), self.max_ep)
    }

    pub(crate) fn heat_gauge(&self) -> Gauge {
        Gauge::with_current(i64::from(self.heat), self.max_heat)
    }
}

/// Pattern contents as produced by the builder, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternDraft {
    pub name: String,
    pub chassis: String,
    pub systems: Vec<String>,
    pub modules: Vec<String>,
    #[serde(flatten)]
    pub stats: PatternStats,
}

/// A user-saved mech pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMechPattern {
    pub id: PatternId,
    pub name: String,
    pub chassis: String,
    #[serde(default)]
    pub systems: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(flatten)]
    pub stats: PatternStats,
}

impl CustomMechPattern {
    fn from_draft(id: PatternId, draft: PatternDraft) -> Self {
        Self {
            id,
            name: draft.name,
            chassis: draft.chassis,
            systems: draft.systems,
            modules: draft.modules,
            stats: draft.stats,
        }
    }

    /// Overwrite pattern-derived fields of `entity`, keeping everything the
    /// entity owns (id, pilots, turn and disabled flags, group colour, kind,
    /// position).
    pub fn apply_to(&self, entity: &mut Entity) {
        entity.name = self.name.clone();
        entity.chassis = Some(self.chassis.clone());
        entity.sp = Some(self.stats.sp_gauge());
        entity.ep = Some(self.stats.ep_gauge());
        entity.heat = Some(self.stats.heat_gauge());
        entity.system_slots = Some(self.stats.system_slots);
        entity.module_slots = Some(self.stats.module_slots);
        entity.systems = self.systems.iter().map(Component::new).collect();
        entity.modules = self.modules.iter().map(Component::new).collect();
    }
}

/// Result of [`save_pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new pattern was appended.
    Created(PatternId),
    /// An existing pattern with the same name was overwritten; entities need refreshing.
    Updated(PatternId),
}

impl SaveOutcome {
    pub fn id(self) -> PatternId {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) => id,
        }
    }
}

/// Insert or overwrite a pattern by name. An existing pattern keeps its id.
pub fn save_pattern(
    patterns: &mut Vec<CustomMechPattern>,
    draft: PatternDraft,
    ids: &mut IdGenerator,
) -> SaveOutcome {
    if let Some(existing) = patterns.iter_mut().find(|p| p.name == draft.name) {
        let id = existing.id;
        *existing = CustomMechPattern::from_draft(id, draft);
        info!(pattern = %existing.name, %id, "Custom pattern updated");
        return SaveOutcome::Updated(id);
    }

    let id = ids.pattern();
    info!(pattern = %draft.name, %id, "Custom pattern created");
    patterns.push(CustomMechPattern::from_draft(id, draft));
    SaveOutcome::Created(id)
}

/// Remove a pattern by name. Entities created from it keep their last-known stats.
pub fn delete_pattern(
    patterns: &mut Vec<CustomMechPattern>,
    name: &str,
) -> Result<CustomMechPattern, TrackerError> {
    let index = patterns
        .iter()
        .position(|p| p.name == name)
        .ok_or_else(|| TrackerError::not_found(LookupKind::CustomPattern, name))?;
    let removed = patterns.remove(index);
    info!(pattern = %removed.name, id = %removed.id, "Custom pattern deleted");
    Ok(removed)
}

/// Refresh every entity carrying `pattern.id`. Returns how many were touched.
pub fn update_entities_from_pattern(entities: &mut [Entity], pattern: &CustomMechPattern) -> usize {
    let mut touched = 0;
    for entity in entities
        .iter_mut()
        .filter(|entity| entity.pattern_id == Some(pattern.id))
    {
        pattern.apply_to(entity);
        touched += 1;
    }
    debug!(pattern = %pattern.name, touched, "Propagated pattern edit");
    touched
}

pub fn find_by_id(patterns: &[CustomMechPattern], id: PatternId) -> Option<&CustomMechPattern> {
    patterns.iter().find(|p| p.id == id)
}

pub fn find_by_name<'a>(patterns: &'a [CustomMechPattern], name: &str) -> Option<&'a CustomMechPattern> {
    patterns.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, GroupColor, Pilot};
    use crate::ids::EntityId;

    fn draft(name: &str, sp: u32, systems: &[&str]) -> PatternDraft {
        PatternDraft {
            name: name.to_string(),
            chassis: "Mule".to_string(),
            systems: systems.iter().map(|s| s.to_string()).collect(),
            modules: vec!["Scanner Suite".to_string()],
            stats: PatternStats {
                sp,
                max_sp: sp,
                ep: 5,
                max_ep: 5,
                heat: 0,
                max_heat: 5,
                system_slots: 8,
                module_slots: 4,
            },
        }
    }

    fn instance(id: u64, pattern: &CustomMechPattern) -> Entity {
        let mut entity = Entity::new(EntityId(id), "placeholder", EntityKind::Mech);
        entity.pattern_id = Some(pattern.id);
        pattern.apply_to(&mut entity);
        entity
    }

    #[test]
    fn resaving_keeps_the_original_id() {
        let mut ids = IdGenerator::default();
        let mut patterns = Vec::new();

        let created = save_pattern(&mut patterns, draft("Hauler Mk2", 10, &["Cargo Bay"]), &mut ids);
        let updated = save_pattern(&mut patterns, draft("Hauler Mk2", 12, &[]), &mut ids);

        assert!(matches!(created, SaveOutcome::Created(_)));
        assert_eq!(updated, SaveOutcome::Updated(created.id()));
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].stats.sp, 12);
        assert!(patterns[0].systems.is_empty());
    }

    #[test]
    fn edits_reach_every_instance_but_spare_owned_fields() {
        let mut ids = IdGenerator::default();
        let mut patterns = Vec::new();
        let id = save_pattern(&mut patterns, draft("Hauler Mk2", 10, &["Cargo Bay"]), &mut ids).id();

        let mut first = instance(1, &patterns[0]);
        first.pilots.push(Pilot::default());
        first.has_acted = true;
        first.group_color = GroupColor::Green;
        let mut second = instance(2, &patterns[0]);
        second.is_disabled = true;
        let mut bystander = Entity::new(EntityId(3), "Bystander", EntityKind::Mech);
        bystander.pattern_id = Some(PatternId(id.0 + 100));
        let mut entities = vec![first, second, bystander];

        save_pattern(
            &mut patterns,
            draft("Hauler Mk2", 14, &["Cargo Bay", "Riot Shield"]),
            &mut ids,
        );
        let pattern = find_by_id(&patterns, id).expect("pattern kept its id");
        assert_eq!(update_entities_from_pattern(&mut entities, pattern), 2);

        for entity in &entities[..2] {
            assert_eq!(entity.sp.map(|g| g.max()), Some(14));
            assert_eq!(entity.systems.len(), 2);
        }
        assert_eq!(entities[0].id, EntityId(1));
        assert_eq!(entities[0].pilots.len(), 1);
        assert!(entities[0].has_acted);
        assert_eq!(entities[0].group_color, GroupColor::Green);
        assert!(entities[1].is_disabled);
        assert_eq!(entities[2].name, "Bystander");
    }

    #[test]
    fn delete_by_name_leaves_others() {
        let mut ids = IdGenerator::default();
        let mut patterns = Vec::new();
        save_pattern(&mut patterns, draft("A", 10, &[]), &mut ids);
        save_pattern(&mut patterns, draft("B", 10, &[]), &mut ids);

        let removed = delete_pattern(&mut patterns, "A").expect("A exists");
        assert_eq!(removed.name, "A");
        assert_eq!(patterns.len(), 1);
        assert!(find_by_name(&patterns, "B").is_some());
        assert!(delete_pattern(&mut patterns, "A").is_err());
    }

    #[test]
    fn stored_patterns_keep_stats_flat() -> anyhow::Result<()> {
        let stored = serde_json::json!({
            "id": 42,
            "name": "Hauler Mk2",
            "chassis": "Mule",
            "systems": ["Cargo Bay"],
            "modules": [],
            "sp": 10, "maxSp": 12,
            "ep": 5, "maxEp": 5,
            "heat": 0, "maxHeat": 5,
            "systemSlots": 8, "moduleSlots": 4
        });
        let pattern: CustomMechPattern = serde_json::from_value(stored.clone())?;
        assert_eq!(pattern.id, PatternId(42));
        assert_eq!(pattern.stats.max_sp, 12);
        assert_eq!(pattern.stats.system_slots, 8);
        assert_eq!(serde_json::to_value(&pattern)?, stored);

        let sparse: CustomMechPattern =
            serde_json::from_value(serde_json::json!({ "id": 7, "name": "Bare", "chassis": "Mule" }))?;
        assert_eq!(sparse.stats, PatternStats::default());
        assert!(sparse.systems.is_empty());
        Ok(())
    }
}
