use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum OptionStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Option store lock poisoned")]
    Poisoned,
}

/// Flat key-value settings store.
pub trait OptionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, OptionStoreError>;

    /// Returns `false` when the stored value was already equal.
    fn set(&self, key: &str, value: Value) -> Result<bool, OptionStoreError>;

    fn delete(&self, key: &str) -> Result<(), OptionStoreError>;
}

pub type DynOptionStore = Arc<dyn OptionStore>;

#[derive(Default)]
pub struct MemoryOptionStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: RwLock::new(values.into_iter().collect()),
        }
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, key: &str) -> Result<Option<Value>, OptionStoreError> {
        let values = self.values.read().map_err(|_| OptionStoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<bool, OptionStoreError> {
        let mut values = self.values.write().map_err(|_| OptionStoreError::Poisoned)?;
        if values.get(key) == Some(&value) {
            return Ok(false);
        }
        values.insert(key.to_string(), value);
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<(), OptionStoreError> {
        let mut values = self.values.write().map_err(|_| OptionStoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// A JSON document on disk holding every key. The file is rewritten on each
/// change.
pub struct JsonFileOptionStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileOptionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OptionStoreError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            info!("Option store {:?} does not exist yet, starting empty", path);
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> Result<(), OptionStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)?;
        debug!("Option store written to {:?}", self.path);
        Ok(())
    }
}

impl OptionStore for JsonFileOptionStore {
    fn get(&self, key: &str) -> Result<Option<Value>, OptionStoreError> {
        let values = self.values.read().map_err(|_| OptionStoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<bool, OptionStoreError> {
        let mut values = self.values.write().map_err(|_| OptionStoreError::Poisoned)?;
        if values.get(key) == Some(&value) {
            return Ok(false);
        }
        values.insert(key.to_string(), value);
        self.persist(&values)?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<(), OptionStoreError> {
        let mut values = self.values.write().map_err(|_| OptionStoreError::Poisoned)?;
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_reports_changes() {
        let store = MemoryOptionStore::new();
        assert!(store.set("a", json!(1)).unwrap());
        assert!(!store.set("a", json!(1)).unwrap());
        assert_eq!(store.get("a").unwrap(), Some(json!(1)));
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_json_file_store_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("options.json");

        let store = JsonFileOptionStore::open(&path).unwrap();
        store.set("mgl_options", json!({ "layout": "masonry" })).unwrap();
        assert!(path.exists());

        let reopened = JsonFileOptionStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("mgl_options").unwrap(),
            Some(json!({ "layout": "masonry" }))
        );

        reopened.delete("mgl_options").unwrap();
        let reopened = JsonFileOptionStore::open(&path).unwrap();
        assert_eq!(reopened.get("mgl_options").unwrap(), None);
    }
}
