use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    catalog::Catalog,
    entity::{
        duplicate_entity, ComponentKind, Entity, EntityFactory, EntityRequest, FieldUpdate,
        MapBounds, PilotPatch, Position,
    },
    error::{LookupKind, SlotKind, TrackerError},
    ids::{EntityId, IdGenerator},
    pattern::{self, CustomMechPattern, PatternDraft, SaveOutcome},
};

use super::{selection::AddEntitySelection, sort};

/// Screen currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    CombatTracker,
    MechBuilder,
    CombatMap,
}

/// Discrete user action accepted by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AddEntity(EntityRequest),
    UpdateEntity {
        id: EntityId,
        updates: Vec<FieldUpdate>,
    },
    RemoveEntity(EntityId),
    DuplicateEntity(EntityId),
    ToggleActed(EntityId),
    ToggleDisabled(EntityId),
    CycleGroupColor(EntityId),
    MoveEntity {
        id: EntityId,
        position: Position,
    },
    CycleCondition {
        id: EntityId,
        kind: ComponentKind,
        index: usize,
    },
    AddPilot(EntityId),
    UpdatePilot {
        id: EntityId,
        index: usize,
        patch: PilotPatch,
    },
    RemovePilot {
        id: EntityId,
        index: usize,
    },
    AttachComponent {
        id: EntityId,
        slot: SlotKind,
        name: String,
    },
    DetachComponent {
        id: EntityId,
        kind: ComponentKind,
        index: usize,
    },
    SavePattern(PatternDraft),
    DeletePattern(String),
    SetTab(Tab),
}

/// Which persisted collections an event touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub entities: bool,
    pub patterns: bool,
    pub tab: bool,
}

impl Changes {
    fn entities() -> Self {
        Self {
            entities: true,
            ..Self::default()
        }
    }

    fn entities_if(changed: bool) -> Self {
        Self {
            entities: changed,
            ..Self::default()
        }
    }

    pub fn any(&self) -> bool {
        self.entities || self.patterns || self.tab
    }
}

/// Live entities, saved patterns and UI state owned by the application root.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    entities: Vec<Entity>,
    patterns: Vec<CustomMechPattern>,
    tab: Tab,
    selection: AddEntitySelection,
    ids: IdGenerator,
}

impl SessionState {
    /// Restore a session. Fresh ids will never collide with loaded ones.
    pub fn new(entities: Vec<Entity>, patterns: Vec<CustomMechPattern>, tab: Tab) -> Self {
        let mut ids = IdGenerator::default();
        for entity in &entities {
            ids.observe(entity.id.0);
        }
        for pattern in &patterns {
            ids.observe(pattern.id.0);
        }
        Self {
            entities,
            patterns,
            tab,
            selection: AddEntitySelection::default(),
            ids,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn patterns(&self) -> &[CustomMechPattern] {
        &self.patterns
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn selection(&self) -> &AddEntitySelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut AddEntitySelection {
        &mut self.selection
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    fn position_of(&self, id: EntityId) -> Result<usize, TrackerError> {
        self.entities
            .iter()
            .position(|entity| entity.id == id)
            .ok_or_else(|| TrackerError::not_found(LookupKind::Entity, id.to_string()))
    }

    /// Run `edit` on a copy of the entity and swap it in only on success.
    fn edit_entity<R>(
        &mut self,
        id: EntityId,
        edit: impl FnOnce(&mut Entity) -> Result<R, TrackerError>,
    ) -> Result<R, TrackerError> {
        let index = self.position_of(id)?;
        let mut draft = self.entities[index].clone();
        let result = edit(&mut draft)?;
        self.entities[index] = draft;
        Ok(result)
    }

    pub fn add_entity(&mut self, entity: Entity) {
        info!(id = %entity.id, name = %entity.name, "Entity added");
        self.entities.push(entity);
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, TrackerError> {
        let index = self.position_of(id)?;
        let removed = self.entities.remove(index);
        info!(id = %removed.id, name = %removed.name, "Entity removed");
        Ok(removed)
    }

    /// Replace the stored record with the same id.
    pub fn update_entity(&mut self, entity: Entity) -> Result<(), TrackerError> {
        let index = self.position_of(entity.id)?;
        self.entities[index] = entity;
        Ok(())
    }

    /// Flip `has_acted`; once every entity has acted all flags reset for a new
    /// round. Returns `true` when the round reset.
    pub fn toggle_acted(&mut self, id: EntityId) -> Result<bool, TrackerError> {
        let index = self.position_of(id)?;
        self.entities[index].toggle_acted();
        let round_over = self.entities.iter().all(|entity| entity.has_acted);
        if round_over {
            for entity in &mut self.entities {
                entity.has_acted = false;
            }
            info!(entities = self.entities.len(), "All entities acted; new round");
        }
        Ok(round_over)
    }

    /// Cosmetic re-sort by group colour then name.
    pub fn sort_entities(&mut self) {
        sort::sort_entities(&mut self.entities);
    }

    /// Apply one event. On error nothing in the session has changed.
    pub fn apply(
        &mut self,
        event: SessionEvent,
        catalog: &Catalog,
        bounds: MapBounds,
    ) -> Result<Changes, TrackerError> {
        debug!(?event, "Applying session event");
        let changes = match event {
            SessionEvent::AddEntity(request) => {
                let entity =
                    EntityFactory::new(catalog, &self.patterns, bounds).create(&request, &mut self.ids)?;
                self.add_entity(entity);
                Changes::entities()
            }
            SessionEvent::UpdateEntity { id, updates } => {
                let changed = self.edit_entity(id, |entity| {
                    Ok(updates
                        .into_iter()
                        .fold(false, |changed, update| entity.set_field(update) || changed))
                })?;
                Changes::entities_if(changed)
            }
            SessionEvent::RemoveEntity(id) => {
                self.remove_entity(id)?;
                Changes::entities()
            }
            SessionEvent::DuplicateEntity(id) => {
                let index = self.position_of(id)?;
                let copy = duplicate_entity(
                    &self.entities[index],
                    self.entities.iter().map(|entity| entity.name.as_str()),
                    &mut self.ids,
                    bounds,
                );
                self.add_entity(copy);
                Changes::entities()
            }
            SessionEvent::ToggleActed(id) => {
                self.toggle_acted(id)?;
                Changes::entities()
            }
            SessionEvent::ToggleDisabled(id) => {
                self.edit_entity(id, |entity| {
                    entity.toggle_disabled();
                    Ok(())
                })?;
                Changes::entities()
            }
            SessionEvent::CycleGroupColor(id) => {
                self.edit_entity(id, |entity| {
                    entity.cycle_group_color();
                    Ok(())
                })?;
                Changes::entities()
            }
            SessionEvent::MoveEntity { id, position } => {
                self.edit_entity(id, |entity| {
                    entity.move_to(position);
                    Ok(())
                })?;
                Changes::entities()
            }
            SessionEvent::CycleCondition { id, kind, index } => {
                let changed =
                    self.edit_entity(id, |entity| Ok(entity.cycle_condition(kind, index)))?;
                Changes::entities_if(changed)
            }
            SessionEvent::AddPilot(id) => {
                self.edit_entity(id, |entity| {
                    entity.add_pilot();
                    Ok(())
                })?;
                Changes::entities()
            }
            SessionEvent::UpdatePilot { id, index, patch } => {
                let changed = self.edit_entity(id, |entity| Ok(entity.update_pilot(index, &patch)))?;
                Changes::entities_if(changed)
            }
            SessionEvent::RemovePilot { id, index } => {
                let changed = self.edit_entity(id, |entity| Ok(entity.remove_pilot(index)))?;
                Changes::entities_if(changed)
            }
            SessionEvent::AttachComponent { id, slot, name } => {
                self.edit_entity(id, |entity| entity.attach_component(catalog, slot, &name))?;
                Changes::entities()
            }
            SessionEvent::DetachComponent { id, kind, index } => {
                let removed = self.edit_entity(id, |entity| Ok(entity.detach_component(kind, index)))?;
                Changes::entities_if(removed.is_some())
            }
            SessionEvent::SavePattern(draft) => self.save_pattern(draft),
            SessionEvent::DeletePattern(name) => {
                pattern::delete_pattern(&mut self.patterns, &name)?;
                Changes {
                    patterns: true,
                    ..Changes::default()
                }
            }
            SessionEvent::SetTab(tab) => {
                let changed = self.tab != tab;
                self.tab = tab;
                Changes {
                    tab: changed,
                    ..Changes::default()
                }
            }
        };
        Ok(changes)
    }

    /// Save a pattern and, when it replaced an existing one, refresh every
    /// entity built from it in the same step.
    pub fn save_pattern(&mut self, draft: PatternDraft) -> Changes {
        match pattern::save_pattern(&mut self.patterns, draft, &mut self.ids) {
            SaveOutcome::Created(_) => Changes {
                patterns: true,
                ..Changes::default()
            },
            SaveOutcome::Updated(id) => {
                let touched = pattern::find_by_id(&self.patterns, id)
                    .map(|saved| pattern::update_entities_from_pattern(&mut self.entities, saved))
                    .unwrap_or(0);
                Changes {
                    entities: touched > 0,
                    patterns: true,
                    tab: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::entity::{Condition, GroupColor, Stat};
    use crate::pattern::PatternStats;

    fn catalog() -> Catalog {
        Catalog::bundled().expect("bundled catalog parses")
    }

    fn striker() -> SessionEvent {
        SessionEvent::AddEntity(EntityRequest::CatalogMech {
            chassis: "Buzzsaw".to_string(),
            pattern: "Striker".to_string(),
        })
    }

    fn session_with(count: usize, catalog: &Catalog) -> SessionState {
        let mut state = SessionState::default();
        for _ in 0..count {
            state
                .apply(striker(), catalog, MapBounds::default())
                .expect("striker exists");
        }
        state
    }

    fn ids(state: &SessionState) -> Vec<EntityId> {
        state.entities().iter().map(|e| e.id).collect()
    }

    fn draft(sp: u32, systems: &[&str]) -> PatternDraft {
        PatternDraft {
            name: "Scrapper".to_string(),
            chassis: "Mule".to_string(),
            systems: systems.iter().map(|s| s.to_string()).collect(),
            modules: vec![],
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

    #[test]
    fn last_pending_entity_starts_a_new_round() {
        let catalog = catalog();
        let mut state = session_with(3, &catalog);
        let all = ids(&state);

        assert!(!state.toggle_acted(all[0]).expect("exists"));
        assert!(!state.toggle_acted(all[1]).expect("exists"));
        let flags: Vec<bool> = state.entities().iter().map(|e| e.has_acted).collect();
        assert_eq!(flags, vec![true, true, false]);

        assert!(state.toggle_acted(all[2]).expect("exists"));
        assert!(state.entities().iter().all(|e| !e.has_acted));
    }

    #[test]
    fn toggling_back_does_not_touch_others() {
        let catalog = catalog();
        let mut state = session_with(2, &catalog);
        let all = ids(&state);
        state.toggle_acted(all[0]).expect("exists");
        state.toggle_acted(all[0]).expect("exists");
        assert!(state.entities().iter().all(|e| !e.has_acted));
    }

    #[test]
    fn failed_attach_leaves_entity_untouched() {
        let catalog = catalog();
        let mut state = session_with(1, &catalog);
        let id = ids(&state)[0];
        let before = state.entity(id).cloned();

        let result = state.apply(
            SessionEvent::AttachComponent {
                id,
                slot: SlotKind::System,
                name: "Autocannon".to_string(),
            },
            &catalog,
            MapBounds::default(),
        );
        assert!(result.is_ok(), "3 + 3 fits in 6");
        let result = state.apply(
            SessionEvent::AttachComponent {
                id,
                slot: SlotKind::System,
                name: "Missile Pod".to_string(),
            },
            &catalog,
            MapBounds::default(),
        );
        assert!(matches!(result, Err(TrackerError::OutOfBudget { .. })));
        let after = state.entity(id).expect("still there");
        assert_eq!(after.systems.len(), before.map(|e| e.systems.len() + 1).unwrap_or(0));
    }

    #[test]
    fn missing_entity_is_not_found() {
        let catalog = catalog();
        let mut state = session_with(1, &catalog);
        let err = state
            .apply(
                SessionEvent::ToggleDisabled(EntityId(1)),
                &catalog,
                MapBounds::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::NotFound {
                kind: LookupKind::Entity,
                ..
            }
        ));
    }

    #[test]
    fn entity_events_edit_the_right_record() {
        let catalog = catalog();
        let mut state = session_with(2, &catalog);
        let all = ids(&state);
        let bounds = MapBounds::default();

        let changes = state
            .apply(
                SessionEvent::UpdateEntity {
                    id: all[1],
                    updates: vec![
                        FieldUpdate::Name("Rust Bucket".to_string()),
                        FieldUpdate::Current(Stat::Heat, 4),
                    ],
                },
                &catalog,
                bounds,
            )
            .expect("exists");
        assert_eq!(changes, Changes::entities());
        state
            .apply(SessionEvent::CycleGroupColor(all[1]), &catalog, bounds)
            .expect("exists");
        state
            .apply(
                SessionEvent::CycleCondition {
                    id: all[1],
                    kind: ComponentKind::Module,
                    index: 0,
                },
                &catalog,
                bounds,
            )
            .expect("exists");
        state
            .apply(SessionEvent::AddPilot(all[1]), &catalog, bounds)
            .expect("exists");

        let edited = state.entity(all[1]).expect("exists");
        assert_eq!(edited.name, "Rust Bucket");
        assert_eq!(edited.heat.map(|g| g.current()), Some(4));
        assert_eq!(edited.group_color, GroupColor::Red);
        assert_eq!(edited.modules[0].condition, Condition::Damaged);
        assert_eq!(edited.pilots.len(), 1);

        let untouched = state.entity(all[0]).expect("exists");
        assert_eq!(untouched.name, "Buzzsaw - Striker");
        assert!(untouched.pilots.is_empty());

        let changes = state
            .apply(
                SessionEvent::RemovePilot {
                    id: all[0],
                    index: 0,
                },
                &catalog,
                bounds,
            )
            .expect("exists");
        assert!(!changes.any());
    }

    #[test]
    fn duplicates_pick_next_copy_number() {
        let catalog = catalog();
        let mut state = session_with(1, &catalog);
        let original = ids(&state)[0];
        let bounds = MapBounds::default();

        state
            .apply(SessionEvent::DuplicateEntity(original), &catalog, bounds)
            .expect("exists");
        state
            .apply(SessionEvent::DuplicateEntity(original), &catalog, bounds)
            .expect("exists");
        let copy = ids(&state)[2];
        state
            .apply(SessionEvent::DuplicateEntity(copy), &catalog, bounds)
            .expect("exists");

        let names: Vec<&str> = state.entities().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Buzzsaw - Striker",
                "Buzzsaw - Striker (1)",
                "Buzzsaw - Striker (2)",
                "Buzzsaw - Striker (3)",
            ]
        );
        let unique: BTreeSet<EntityId> = ids(&state).into_iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn pattern_edit_propagates_to_instances() {
        let catalog = catalog();
        let bounds = MapBounds::default();
        let mut state = SessionState::default();

        let changes = state.save_pattern(draft(10, &["Cargo Bay"]));
        assert_eq!(
            changes,
            Changes {
                patterns: true,
                ..Changes::default()
            }
        );
        let pattern_id = state.patterns()[0].id;
        for _ in 0..2 {
            state
                .apply(
                    SessionEvent::AddEntity(EntityRequest::CustomPattern { pattern_id }),
                    &catalog,
                    bounds,
                )
                .expect("pattern exists");
        }
        state.apply(striker(), &catalog, bounds).expect("striker exists");
        let all = ids(&state);
        state.toggle_acted(all[0]).expect("exists");
        state
            .apply(SessionEvent::AddPilot(all[1]), &catalog, bounds)
            .expect("exists");

        let changes = state
            .apply(
                SessionEvent::SavePattern(draft(16, &["Cargo Bay", "Riot Shield"])),
                &catalog,
                bounds,
            )
            .expect("save never fails");
        assert!(changes.entities && changes.patterns);
        assert_eq!(state.patterns().len(), 1);
        assert_eq!(state.patterns()[0].id, pattern_id);

        for id in &all[..2] {
            let entity = state.entity(*id).expect("exists");
            assert_eq!(entity.sp.map(|g| g.max()), Some(16));
            assert_eq!(entity.systems.len(), 2);
        }
        assert!(state.entity(all[0]).expect("exists").has_acted);
        assert_eq!(state.entity(all[1]).expect("exists").pilots.len(), 1);
        assert_eq!(ids(&state), all);
        assert_eq!(
            state.entity(all[2]).expect("exists").name,
            "Buzzsaw - Striker"
        );

        state
            .apply(
                SessionEvent::DeletePattern("Scrapper".to_string()),
                &catalog,
                bounds,
            )
            .expect("exists");
        assert!(state.patterns().is_empty());
        assert_eq!(state.entity(all[0]).and_then(|e| e.pattern_id), Some(pattern_id));
    }

    #[test]
    fn restored_ids_are_not_reissued() {
        let catalog = catalog();
        let mut original = session_with(1, &catalog);
        original
            .apply(
                SessionEvent::SetTab(Tab::CombatMap),
                &catalog,
                MapBounds::default(),
            )
            .expect("set tab");
        let mut restored = SessionState::new(
            original.entities().to_vec(),
            Vec::new(),
            original.tab(),
        );
        assert_eq!(restored.tab(), Tab::CombatMap);
        restored
            .apply(striker(), &catalog, MapBounds::default())
            .expect("striker exists");
        assert!(restored.entities()[1].id > restored.entities()[0].id);
    }
}
