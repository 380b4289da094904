//! Application configuration: file defaults layered with `SALVAGE_*` env vars.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entity::MapBounds;

/// Directory under the user's config/data dirs used by the tracker.
pub const APP_DIR: &str = "salvage-tracker";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "SALVAGE";

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the persisted session keys.
    pub storage_root: PathBuf,
    /// Optional directory with catalog JSON files; the bundled catalog is used when unset.
    #[serde(default)]
    pub catalog_root: Option<PathBuf>,
    /// Quiet period before entities are re-sorted.
    pub sort_delay_ms: u64,
    /// Combat map width used for token placement.
    pub map_width: f32,
    /// Combat map height used for token placement.
    pub map_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            catalog_root: None,
            sort_delay_ms: 1500,
            map_width: 800.0,
            map_height: 600.0,
        }
    }
}

impl AppConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load `path` (optional) over the built-in defaults, then apply env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = toml_defaults();
        let settings = Config::builder()
            .add_source(File::from_str(&defaults, FileFormat::Toml))
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Debounce delay for the cosmetic re-sort.
    pub fn sort_delay(&self) -> Duration {
        Duration::from_millis(self.sort_delay_ms)
    }

    /// Map extent for newly placed tokens.
    pub fn map_bounds(&self) -> MapBounds {
        MapBounds {
            width: self.map_width,
            height: self.map_height,
        }
    }
}

fn toml_defaults() -> String {
    let defaults = AppConfig::default();
    let mut lines = vec![
        format!("storage_root = {:?}", defaults.storage_root.display().to_string()),
        format!("sort_delay_ms = {}", defaults.sort_delay_ms),
        format!("map_width = {:.1}", defaults.map_width),
        format!("map_height = {:.1}", defaults.map_height),
    ];
    if let Some(root) = &defaults.catalog_root {
        lines.push(format!("catalog_root = {:?}", root.display().to_string()));
    }
    lines.join("\n")
}

/// Write a default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    ensure_config_at(AppConfig::default_path())
}

/// Write a default config file at `path` if none exists yet.
pub fn ensure_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, toml_defaults())
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote default config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.sort_delay_ms, 1500);
        assert_eq!(config.catalog_root, None);
        assert_eq!(config.map_bounds(), MapBounds::default());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "sort_delay_ms = 250\ncatalog_root = \"/srv/catalog\"\nstorage_root = \"/tmp/salvage\"\n",
        )?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.sort_delay(), Duration::from_millis(250));
        assert_eq!(config.catalog_root, Some(PathBuf::from("/srv/catalog")));
        assert_eq!(config.storage_root, PathBuf::from("/tmp/salvage"));
        Ok(())
    }

    #[test]
    fn ensure_config_writes_once() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        ensure_config_at(&path)?;
        assert!(path.exists());
        fs::write(&path, "sort_delay_ms = 10\n")?;
        ensure_config_at(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "sort_delay_ms = 10\n");
        Ok(())
    }
}
