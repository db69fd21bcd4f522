//! Persisted key/value settings.
//!
//! The only value stored today is the canonical endpoint URL under
//! [`ENDPOINT_KEY`]. The file store keeps a flat JSON object so other
//! string settings can be added without a migration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, UsageError};

/// Key holding the canonical endpoint URL.
pub const ENDPOINT_KEY: &str = "endpoint_url";

/// String key/value store for user settings.
pub trait SettingsStore: Send {
    /// Stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Persist `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

// =============================================================================
// File store
// =============================================================================

/// JSON-file backed settings store.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSettingsStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or is not a JSON
    /// object of strings.
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    UsageError::SettingsStore(format!("{}: {e}", path.display()))
                })?
            }
        } else {
            tracing::debug!(?path, "Settings file not found, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)?;
        tracing::debug!(path = ?self.path, "Settings saved");
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.save() {
            // Keep memory consistent with disk.
            match previous {
                Some(old) => self.values.insert(key.to_string(), old),
                None => self.values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

// =============================================================================
// Memory store
// =============================================================================

/// In-memory settings store.
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
    writes: usize,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one value.
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(key.to_string(), value.to_string());
        Self { values, writes: 0 }
    }

    /// Number of `set` calls so far.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}
