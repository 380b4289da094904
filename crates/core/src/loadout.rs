//! Derived slot usage and salvage totals for a chassis plus its components.

use crate::{
    catalog::{Catalog, ChassisStats},
    error::{SlotKind, TrackerError},
};

/// Highest tech level tracked in salvage totals.
pub const MAX_TECH_LEVEL: u8 = 6;

/// Slots consumed and salvage value broken down by tech level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loadout {
    /// Sum of `slotsRequired` over attached systems.
    pub used_system_slots: u32,
    /// Sum of `slotsRequired` over attached modules.
    pub used_module_slots: u32,
    /// Salvage value per tech level; index 0 is TL1.
    pub salvage_by_tech_level: [u32; MAX_TECH_LEVEL as usize],
}

impl Loadout {
    /// Compute totals. Names missing from the catalog count as zero.
    pub fn compute<'a>(
        catalog: &Catalog,
        chassis: Option<&ChassisStats>,
        systems: impl IntoIterator<Item = &'a str>,
        modules: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut loadout = Loadout::default();
        if let Some(stats) = chassis {
            loadout.add_salvage(stats.tech_level, stats.salvage_value);
        }
        for name in systems {
            if let Ok(component) = catalog.system(name) {
                loadout.used_system_slots += component.slots_required();
                loadout.add_salvage(component.tech_level(), component.salvage_value());
            }
        }
        for name in modules {
            if let Ok(component) = catalog.module(name) {
                loadout.used_module_slots += component.slots_required();
                loadout.add_salvage(component.tech_level(), component.salvage_value());
            }
        }
        loadout
    }

    fn add_salvage(&mut self, tech_level: u8, value: u32) {
        let index = usize::from(tech_level.clamp(1, MAX_TECH_LEVEL) - 1);
        self.salvage_by_tech_level[index] += value;
    }

    /// Salvage at a given tech level (1-based).
    pub fn salvage_at(&self, tech_level: u8) -> u32 {
        match tech_level {
            1..=MAX_TECH_LEVEL => self.salvage_by_tech_level[usize::from(tech_level - 1)],
            _ => 0,
        }
    }

    pub fn used(&self, slot: SlotKind) -> u32 {
        match slot {
            SlotKind::System => self.used_system_slots,
            SlotKind::Module => self.used_module_slots,
        }
    }

    /// Reject a component that would push `slot` usage past `capacity`.
    pub fn ensure_fits(
        &self,
        slot: SlotKind,
        required: u32,
        capacity: u32,
    ) -> Result<(), TrackerError> {
        let used = self.used(slot);
        if used + required > capacity {
            return Err(TrackerError::OutOfBudget {
                slot,
                required,
                used,
                capacity,
            });
        }
        Ok(())
    }
}
