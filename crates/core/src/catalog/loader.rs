use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use super::{
    models::{CatalogChassis, CatalogComponent, ComponentData, EntityCategory},
    Catalog,
};

/// File names expected inside a catalog directory.
pub const CHASSIS_FILE: &str = "chassis.json";
pub const SYSTEMS_FILE: &str = "systems.json";
pub const MODULES_FILE: &str = "modules.json";
pub const OTHER_ENTITIES_FILE: &str = "other_entities.json";

const BUNDLED_CHASSIS: &str = include_str!("../../data/chassis.json");
const BUNDLED_SYSTEMS: &str = include_str!("../../data/systems.json");
const BUNDLED_MODULES: &str = include_str!("../../data/modules.json");
const BUNDLED_OTHER_ENTITIES: &str = include_str!("../../data/other_entities.json");

#[derive(Debug, Deserialize)]
struct RawChassisFile {
    #[serde(default)]
    mech_chassis: Vec<CatalogChassis>,
}

#[derive(Debug, Deserialize)]
struct RawSystemsFile {
    #[serde(default)]
    systems: BTreeMap<String, ComponentData>,
}

#[derive(Debug, Deserialize)]
struct RawModulesFile {
    #[serde(default)]
    modules: BTreeMap<String, ComponentData>,
}

#[derive(Debug, Deserialize)]
struct RawOtherEntitiesFile {
    #[serde(default)]
    other_entities: Vec<EntityCategory>,
}

/// Raw JSON sources for the four catalog tables.
pub struct CatalogSources<'a> {
    pub chassis: &'a str,
    pub systems: &'a str,
    pub modules: &'a str,
    pub other_entities: &'a str,
}

impl Catalog {
    /// Catalog compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_sources(CatalogSources {
            chassis: BUNDLED_CHASSIS,
            systems: BUNDLED_SYSTEMS,
            modules: BUNDLED_MODULES,
            other_entities: BUNDLED_OTHER_ENTITIES,
        })
        .context("bundled catalog is malformed")
    }

    /// Load the four catalog files from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let chassis = read_table(dir.join(CHASSIS_FILE))?;
        let systems = read_table(dir.join(SYSTEMS_FILE))?;
        let modules = read_table(dir.join(MODULES_FILE))?;
        let other_entities = read_table(dir.join(OTHER_ENTITIES_FILE))?;
        let catalog = Self::from_sources(CatalogSources {
            chassis: &chassis,
            systems: &systems,
            modules: &modules,
            other_entities: &other_entities,
        })
        .with_context(|| format!("failed to parse catalog in {}", dir.display()))?;
        Ok(catalog)
    }

    /// Use `dir` when configured, otherwise the bundled catalog.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::load_dir(dir),
            None => Self::bundled(),
        }
    }

    /// Parse the catalog tables from JSON text.
    pub fn from_sources(sources: CatalogSources<'_>) -> Result<Self> {
        let chassis: RawChassisFile =
            serde_json::from_str(sources.chassis).context("failed to parse chassis table")?;
        let systems: RawSystemsFile =
            serde_json::from_str(sources.systems).context("failed to parse systems table")?;
        let modules: RawModulesFile =
            serde_json::from_str(sources.modules).context("failed to parse modules table")?;
        let others: RawOtherEntitiesFile = serde_json::from_str(sources.other_entities)
            .context("failed to parse other entities table")?;

        let catalog = Catalog {
            chassis: chassis.mech_chassis,
            systems: into_components(systems.systems),
            modules: into_components(modules.modules),
            categories: others.other_entities,
        };
        info!(
            chassis = catalog.chassis.len(),
            systems = catalog.systems.len(),
            modules = catalog.modules.len(),
            categories = catalog.categories.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }
}

fn into_components(table: BTreeMap<String, ComponentData>) -> BTreeMap<String, CatalogComponent> {
    table
        .into_iter()
        .map(|(name, data)| (name.clone(), CatalogComponent { name, data }))
        .collect()
}

fn read_table(path: PathBuf) -> Result<String> {
    fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_catalog_directory() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join(CHASSIS_FILE),
            r#"{ "mech_chassis": [ { "name": "Tick", "stats": {
                "structure_pts": 3, "energy_pts": 2, "heat_cap": 2,
                "system_slots": 2, "module_slots": 1,
                "tech_level": 1, "salvage_value": 4 },
                "patterns": [ { "name": "Basic", "systems": ["Prod"] } ] } ] }"#,
        )?;
        fs::write(
            dir.path().join(SYSTEMS_FILE),
            r#"{ "systems": { "Prod": { "techLevel": 1, "slotsRequired": 1, "salvageValue": 1 } } }"#,
        )?;
        fs::write(dir.path().join(MODULES_FILE), r#"{ "modules": {} }"#)?;
        fs::write(
            dir.path().join(OTHER_ENTITIES_FILE),
            r#"{ "other_entities": [] }"#,
        )?;

        let catalog = Catalog::load_dir(dir.path())?;
        assert_eq!(catalog.chassis_names().collect::<Vec<_>>(), vec!["Tick"]);
        assert!(catalog.pattern("Tick", "Basic").is_ok());
        assert!(catalog.pattern("Tick", "Basic")?.modules.is_empty());
        assert_eq!(catalog.system("Prod")?.slots_required(), 1);
        Ok(())
    }

    #[test]
    fn missing_catalog_file_reports_path() -> Result<()> {
        let dir = tempdir()?;
        let err = Catalog::load_dir(dir.path()).expect_err("empty directory must fail");
        assert!(format!("{err:#}").contains(CHASSIS_FILE));
        Ok(())
    }
}
