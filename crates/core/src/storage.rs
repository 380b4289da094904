//! Best-effort key/value persistence for the tracker session.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Key holding the active UI tab.
pub const ACTIVE_TAB_KEY: &str = "activeTab";
/// Key holding the serialized entity list.
pub const ENTITIES_KEY: &str = "entities";
/// Key holding the serialized custom pattern list.
pub const PATTERNS_KEY: &str = "customMechPatterns";

/// Flat string store addressed by key.
pub trait Storage {
    /// Stored value for `key`, or `None` when absent.
    fn read(&self, key: &str) -> Result<Option<String>>;
    /// Replace the value stored under `key`.
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key inside a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the store writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.key_path(key);
        fs::write(&path, value).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// In-process store, used by tests and as a fallback when no directory is writable.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Decode `key`, falling back to the default when absent or unreadable.
pub fn load_or_default<T>(storage: &dyn Storage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            warn!("Failed to read stored {key}: {err:#}");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("Discarding unparsable stored {key}: {err}");
            T::default()
        }
    }
}

/// Encode and write `value` under `key`.
pub fn store<T: Serialize + ?Sized>(storage: &mut dyn Storage, key: &str, value: &T) -> Result<()> {
    let serialised =
        serde_json::to_string(value).with_context(|| format!("failed to serialize {key}"))?;
    storage.write(key, &serialised)
}

fn sanitize_key(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "value".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_storage_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.read(ENTITIES_KEY)?, None);

        store(&mut storage, ENTITIES_KEY, &vec![1, 2, 3])?;
        assert!(dir.path().join("nested/entities.json").exists());
        let loaded: Vec<u32> = load_or_default(&storage, ENTITIES_KEY);
        assert_eq!(loaded, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn garbage_falls_back_to_default() -> Result<()> {
        let mut storage = MemoryStorage::new();
        storage.write(PATTERNS_KEY, "{not json")?;
        let loaded: Vec<String> = load_or_default(&storage, PATTERNS_KEY);
        assert!(loaded.is_empty());
        Ok(())
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_key("custom Mech/Patterns!"), "customMechPatterns");
        assert_eq!(sanitize_key("../"), "value");
    }
}
