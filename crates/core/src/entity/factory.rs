use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::Catalog,
    error::{LookupKind, TrackerError},
    ids::{IdGenerator, PatternId},
    pattern::{self, CustomMechPattern},
};

use super::models::{Component, Entity, EntityKind, Gauge, Position};

/// Name given to a mech added without any pattern.
pub const BLANK_MECH_NAME: &str = "New Custom Mech";

const MAP_MARGIN: f32 = 50.0;

/// What the user picked in the add-entity flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRequest {
    /// Catalog chassis with one of its preset patterns.
    CatalogMech { chassis: String, pattern: String },
    /// Mech built from a saved custom pattern.
    CustomPattern { pattern_id: PatternId },
    /// Mech with fixed defaults and no components.
    BlankMech,
    /// Non-mech template from a category.
    Other { category: String, template: String },
}

/// Extent of the combat map; new tokens are dropped somewhere inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl MapBounds {
    /// Random point at least `MAP_MARGIN` from every edge.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        Position {
            x: span(rng, self.width),
            y: span(rng, self.height),
        }
    }
}

fn span<R: Rng + ?Sized>(rng: &mut R, extent: f32) -> f32 {
    let upper = extent - MAP_MARGIN;
    if upper <= MAP_MARGIN {
        return extent / 2.0;
    }
    rng.gen_range(MAP_MARGIN..upper).floor()
}

/// Builds new entity records from catalog selections or saved patterns.
///
/// The factory has no side effects beyond consuming an id; appending the
/// record to the session is the caller's job.
pub struct EntityFactory<'a> {
    catalog: &'a Catalog,
    patterns: &'a [CustomMechPattern],
    bounds: MapBounds,
}

impl<'a> EntityFactory<'a> {
    pub fn new(catalog: &'a Catalog, patterns: &'a [CustomMechPattern], bounds: MapBounds) -> Self {
        Self {
            catalog,
            patterns,
            bounds,
        }
    }

    pub fn create(
        &self,
        request: &EntityRequest,
        ids: &mut IdGenerator,
    ) -> Result<Entity, TrackerError> {
        let mut entity = match request {
            EntityRequest::CatalogMech { chassis, pattern } => {
                self.catalog_mech(chassis, pattern, ids)?
            }
            EntityRequest::CustomPattern { pattern_id } => self.pattern_mech(*pattern_id, ids)?,
            EntityRequest::BlankMech => blank_mech(ids),
            EntityRequest::Other { category, template } => {
                self.other_entity(category, template, ids)?
            }
        };
        entity.position = Some(self.bounds.random_position(&mut rand::thread_rng()));
        debug!(id = %entity.id, name = %entity.name, "Entity created");
        Ok(entity)
    }

    fn catalog_mech(
        &self,
        chassis_name: &str,
        pattern_name: &str,
        ids: &mut IdGenerator,
    ) -> Result<Entity, TrackerError> {
        let chassis = self.catalog.chassis(chassis_name)?;
        let pattern = self.catalog.pattern(chassis_name, pattern_name)?;
        let stats = &chassis.stats;

        let mut entity = Entity::new(
            ids.entity(),
            format!("{chassis_name} - {pattern_name}"),
            EntityKind::Mech,
        );
        entity.chassis = Some(chassis.name.clone());
        entity.sp = Some(Gauge::full(stats.structure_pts));
        entity.ep = Some(Gauge::full(stats.energy_pts));
        entity.heat = Some(Gauge::empty(stats.heat_cap));
        entity.system_slots = Some(stats.system_slots);
        entity.module_slots = Some(stats.module_slots);
        entity.systems = pattern.systems.iter().map(Component::new).collect();
        entity.modules = pattern.modules.iter().map(Component::new).collect();
        Ok(entity)
    }

    fn pattern_mech(
        &self,
        pattern_id: PatternId,
        ids: &mut IdGenerator,
    ) -> Result<Entity, TrackerError> {
        let pattern = pattern::find_by_id(self.patterns, pattern_id).ok_or_else(|| {
            TrackerError::not_found(LookupKind::CustomPattern, pattern_id.to_string())
        })?;
        let mut entity = Entity::new(ids.entity(), pattern.name.clone(), EntityKind::Mech);
        entity.pattern_id = Some(pattern.id);
        pattern.apply_to(&mut entity);
        Ok(entity)
    }

    fn other_entity(
        &self,
        category: &str,
        template_name: &str,
        ids: &mut IdGenerator,
    ) -> Result<Entity, TrackerError> {
        let template = self.catalog.template(category, template_name)?;
        let mut entity = Entity::new(ids.entity(), template.name.clone(), EntityKind::Other);
        entity.category = Some(category.to_string());
        entity.description = template.description.clone();
        entity.sp = template.structure_pts.map(Gauge::full);
        entity.hp = template.hp.map(Gauge::full);
        entity.abilities = template
            .abilities
            .iter()
            .map(|ability| Component::new(ability.name.clone()))
            .collect();
        entity.systems = template
            .systems
            .iter()
            .map(|system| Component::new(system.name.clone()))
            .collect();
        Ok(entity)
    }
}

fn blank_mech(ids: &mut IdGenerator) -> Entity {
    let mut entity = Entity::new(ids.entity(), BLANK_MECH_NAME, EntityKind::Mech);
    entity.sp = Some(Gauge::full(10));
    entity.ep = Some(Gauge::full(5));
    entity.heat = Some(Gauge::empty(5));
    entity
}
