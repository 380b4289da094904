#![allow(missing_docs)]

//! Static reference tables: chassis, systems, modules and other-entity templates.

pub mod loader;
mod models;

use std::collections::BTreeMap;

pub use loader::CatalogSources;
pub use models::{
    Ability, CatalogChassis, CatalogComponent, ChassisPattern, ChassisStats, ComponentData,
    EntityCategory, OtherEntityTemplate,
};

use crate::error::{LookupKind, SlotKind, TrackerError};

/// Read-only catalog keyed by name. Loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    chassis: Vec<CatalogChassis>,
    systems: BTreeMap<String, CatalogComponent>,
    modules: BTreeMap<String, CatalogComponent>,
    categories: Vec<EntityCategory>,
}

impl Catalog {
    pub fn chassis_list(&self) -> &[CatalogChassis] {
        &self.chassis
    }

    pub fn chassis_names(&self) -> impl Iterator<Item = &str> {
        self.chassis.iter().map(|chassis| chassis.name.as_str())
    }

    pub fn chassis(&self, name: &str) -> Result<&CatalogChassis, TrackerError> {
        self.chassis
            .iter()
            .find(|chassis| chassis.name == name)
            .ok_or_else(|| TrackerError::not_found(LookupKind::Chassis, name))
    }

    pub fn pattern(&self, chassis: &str, name: &str) -> Result<&ChassisPattern, TrackerError> {
        self.chassis(chassis)?
            .patterns
            .iter()
            .find(|pattern| pattern.name == name)
            .ok_or_else(|| TrackerError::not_found(LookupKind::Pattern, name))
    }

    pub fn system(&self, name: &str) -> Result<&CatalogComponent, TrackerError> {
        self.component(SlotKind::System, name)
    }

    pub fn module(&self, name: &str) -> Result<&CatalogComponent, TrackerError> {
        self.component(SlotKind::Module, name)
    }

    pub fn component(&self, slot: SlotKind, name: &str) -> Result<&CatalogComponent, TrackerError> {
        let (table, kind) = match slot {
            SlotKind::System => (&self.systems, LookupKind::System),
            SlotKind::Module => (&self.modules, LookupKind::Module),
        };
        table
            .get(name)
            .ok_or_else(|| TrackerError::not_found(kind, name))
    }

    pub fn components(&self, slot: SlotKind) -> impl Iterator<Item = &CatalogComponent> {
        match slot {
            SlotKind::System => self.systems.values(),
            SlotKind::Module => self.modules.values(),
        }
    }

    /// Components of one table grouped by tech level, lowest level first.
    pub fn components_by_tech_level(&self, slot: SlotKind) -> BTreeMap<u8, Vec<&CatalogComponent>> {
        let mut grouped: BTreeMap<u8, Vec<&CatalogComponent>> = BTreeMap::new();
        for component in self.components(slot) {
            grouped
                .entry(component.tech_level())
                .or_default()
                .push(component);
        }
        grouped
    }

    pub fn categories(&self) -> &[EntityCategory] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Result<&EntityCategory, TrackerError> {
        self.categories
            .iter()
            .find(|category| category.category == name)
            .ok_or_else(|| TrackerError::not_found(LookupKind::Category, name))
    }

    pub fn template(
        &self,
        category: &str,
        name: &str,
    ) -> Result<&OtherEntityTemplate, TrackerError> {
        self.category(category)?
            .entities
            .iter()
            .find(|template| template.name == name)
            .ok_or_else(|| TrackerError::not_found(LookupKind::Template, name))
    }

    /// First ability called `name` on any template of `category`. Lookup by
    /// category keeps working after an entity is renamed.
    pub fn ability(&self, category: &str, name: &str) -> Option<&Ability> {
        self.category(category)
            .ok()?
            .entities
            .iter()
            .flat_map(|template| template.abilities.iter())
            .find(|ability| ability.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_resolves_every_preset_component() {
        let catalog = Catalog::bundled().expect("bundled catalog parses");
        for chassis in catalog.chassis_list() {
            for pattern in &chassis.patterns {
                for system in &pattern.systems {
                    assert!(catalog.system(system).is_ok(), "{system} missing");
                }
                for module in &pattern.modules {
                    assert!(catalog.module(module).is_ok(), "{module} missing");
                }
            }
        }
    }

    #[test]
    fn lookups_report_what_was_missing() {
        let catalog = Catalog::bundled().expect("bundled catalog parses");
        assert_eq!(
            catalog.pattern("Buzzsaw", "Nope").unwrap_err(),
            TrackerError::not_found(LookupKind::Pattern, "Nope")
        );
        assert_eq!(
            catalog.pattern("Nope", "Striker").unwrap_err(),
            TrackerError::not_found(LookupKind::Chassis, "Nope")
        );
        assert_eq!(
            catalog.template("NPCs", "Dragon").unwrap_err(),
            TrackerError::not_found(LookupKind::Template, "Dragon")
        );
    }

    #[test]
    fn groups_components_by_tech_level() {
        let catalog = Catalog::bundled().expect("bundled catalog parses");
        let grouped = catalog.components_by_tech_level(SlotKind::System);
        let levels: Vec<u8> = grouped.keys().copied().collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
        assert!(grouped[&1].iter().any(|c| c.name == "Vibro Blade"));
    }

    #[test]
    fn template_systems_accept_bare_names() {
        let catalog = Catalog::bundled().expect("bundled catalog parses");
        let crawler = catalog
            .template("Vehicles", "Salvage Crawler")
            .expect("template exists");
        let names: Vec<&str> = crawler.systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Cargo Bay", "Light Machine Gun"]);
    }

    #[test]
    fn abilities_resolve_by_category() {
        let catalog = Catalog::bundled().expect("bundled catalog parses");
        let spray = catalog
            .ability("Bio-Titans", "Acid Spray")
            .expect("ability exists");
        assert_eq!(spray.range.as_deref(), Some("Medium"));
        assert_eq!(spray.damage.as_deref(), Some("4SP"));
        assert_eq!(spray.traits, vec!["Blast".to_string()]);
        assert!(catalog.ability("NPCs", "Acid Spray").is_none());
        assert!(catalog.ability("Nowhere", "Acid Spray").is_none());
    }
}
