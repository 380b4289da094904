//! Working draft for the mech builder screen.

use tracing::debug;

use crate::{
    catalog::{Catalog, CatalogChassis},
    error::{SlotKind, TrackerError},
    loadout::Loadout,
    pattern::{CustomMechPattern, PatternDraft, PatternStats},
};

/// Name a fresh draft starts with.
pub const DEFAULT_BUILD_NAME: &str = "Custom Mech";

/// A mech being assembled from a chassis plus catalog systems and modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechBuild {
    name: String,
    chassis: Option<String>,
    systems: Vec<String>,
    modules: Vec<String>,
    stats: PatternStats,
}

impl Default for MechBuild {
    fn default() -> Self {
        Self {
            name: DEFAULT_BUILD_NAME.to_string(),
            chassis: None,
            systems: Vec::new(),
            modules: Vec::new(),
            stats: PatternStats::default(),
        }
    }
}

impl MechBuild {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chassis(&self) -> Option<&str> {
        self.chassis.as_deref()
    }

    pub fn systems(&self) -> &[String] {
        &self.systems
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn stats(&self) -> &PatternStats {
        &self.stats
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Switch chassis. Installed components survive the switch; an empty
    /// draft simply takes the new chassis stats.
    pub fn select_chassis(&mut self, catalog: &Catalog, name: &str) -> Result<(), TrackerError> {
        let chassis = catalog.chassis(name)?;
        self.apply_chassis(chassis);
        debug!(chassis = name, "Builder chassis selected");
        Ok(())
    }

    fn apply_chassis(&mut self, chassis: &CatalogChassis) {
        let stats = &chassis.stats;
        self.chassis = Some(chassis.name.clone());
        self.stats = PatternStats {
            sp: stats.structure_pts,
            max_sp: stats.structure_pts,
            ep: stats.energy_pts,
            max_ep: stats.energy_pts,
            heat: 0,
            max_heat: stats.heat_cap,
            system_slots: stats.system_slots,
            module_slots: stats.module_slots,
        };
    }

    pub fn add_system(&mut self, catalog: &Catalog, name: &str) -> Result<(), TrackerError> {
        self.add_component(catalog, SlotKind::System, name)
    }

    pub fn add_module(&mut self, catalog: &Catalog, name: &str) -> Result<(), TrackerError> {
        self.add_component(catalog, SlotKind::Module, name)
    }

    fn add_component(
        &mut self,
        catalog: &Catalog,
        slot: SlotKind,
        name: &str,
    ) -> Result<(), TrackerError> {
        let component = catalog.component(slot, name)?;
        let capacity = match slot {
            SlotKind::System => self.stats.system_slots,
            SlotKind::Module => self.stats.module_slots,
        };
        self.loadout(catalog)
            .ensure_fits(slot, component.slots_required(), capacity)?;
        match slot {
            SlotKind::System => self.systems.push(component.name.clone()),
            SlotKind::Module => self.modules.push(component.name.clone()),
        }
        Ok(())
    }

    pub fn remove_system(&mut self, index: usize) -> Option<String> {
        (index < self.systems.len()).then(|| self.systems.remove(index))
    }

    pub fn remove_module(&mut self, index: usize) -> Option<String> {
        (index < self.modules.len()).then(|| self.modules.remove(index))
    }

    /// Back to an empty draft with no chassis.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Rebuild the draft from a saved pattern.
    pub fn load_pattern(
        &mut self,
        catalog: &Catalog,
        pattern: &CustomMechPattern,
    ) -> Result<(), TrackerError> {
        let chassis = catalog.chassis(&pattern.chassis)?;
        *self = Self {
            name: pattern.name.clone(),
            chassis: Some(chassis.name.clone()),
            systems: pattern.systems.clone(),
            modules: pattern.modules.clone(),
            stats: pattern.stats,
        };
        Ok(())
    }

    /// Pattern contents ready to save. `None` until a chassis is selected.
    pub fn to_draft(&self) -> Option<PatternDraft> {
        let chassis = self.chassis.clone()?;
        Some(PatternDraft {
            name: self.name.clone(),
            chassis,
            systems: self.systems.clone(),
            modules: self.modules.clone(),
            stats: self.stats,
        })
    }

    pub fn loadout(&self, catalog: &Catalog) -> Loadout {
        let chassis = self
            .chassis
            .as_deref()
            .and_then(|name| catalog.chassis(name).ok())
            .map(|chassis| &chassis.stats);
        Loadout::compute(
            catalog,
            chassis,
            self.systems.iter().map(String::as_str),
            self.modules.iter().map(String::as_str),
        )
    }
}
