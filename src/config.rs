//! Configuration file loading.
//!
//! A TOML file declares where status lives, the storage instances, and the
//! pairs to keep in sync:
//!
//! ```toml
//! [general]
//! status_path = "~/.pairsync/status"
//!
//! [storages.my_calendar]
//! type = "filesystem"
//! path = "~/calendars"
//! fileext = ".ics"
//!
//! [storages.my_remote]
//! type = "http"
//! url = "https://example.com/items"
//!
//! [pairs.calendars]
//! a = "my_calendar"
//! b = "my_remote"
//! ```
//!
//! Storage tables are converted into [`StorageConfig`] records: `type` and
//! `collection` become first-class fields, the table key becomes the
//! instance name, and everything else is carried as backend options.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::storage::StorageConfig;

const DEFAULT_STATUS_PATH: &str = "~/.pairsync/status";

/// One pair of storages to keep in sync.
#[derive(Debug, Clone, Deserialize)]
pub struct Pair {
    /// Name of the storage on side A.
    pub a: String,
    /// Name of the storage on side B.
    pub b: String,
    /// Collections to sync; `None` means the storages' null collection.
    #[serde(default)]
    pub collections: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGeneral {
    status_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: RawGeneral,
    #[serde(default)]
    storages: BTreeMap<String, toml::Table>,
    #[serde(default)]
    pairs: BTreeMap<String, Pair>,
}

/// Loaded configuration.
#[derive(Debug)]
pub struct Config {
    /// Base directory for status data, unexpanded.
    pub status_path: String,
    storages: BTreeMap<String, StorageConfig>,
    pairs: BTreeMap<String, Pair>,
}

impl Config {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns a TOML error for malformed documents and a user error for
    /// storage tables without a string `type`.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(raw)?;

        let mut storages = BTreeMap::new();
        for (name, table) in raw.storages {
            storages.insert(name.clone(), storage_from_table(&name, table)?);
        }

        Ok(Self {
            status_path: raw
                .general
                .status_path
                .unwrap_or_else(|| DEFAULT_STATUS_PATH.to_string()),
            storages,
            pairs: raw.pairs,
        })
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::user(format!(
                "Cannot read configuration file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&raw)
    }

    /// Look up a pair by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PairNotFound`] for unknown names.
    pub fn pair(&self, name: &str) -> Result<&Pair> {
        self.pairs.get(name).ok_or_else(|| Error::PairNotFound {
            pair: name.to_string(),
        })
    }

    /// Look up a storage by name.
    ///
    /// # Errors
    ///
    /// Returns a user error for unknown names.
    pub fn storage(&self, name: &str) -> Result<&StorageConfig> {
        self.storages.get(name).ok_or_else(|| {
            Error::user(format!(
                "Storage {name} is not defined in the configuration"
            ))
        })
    }

    /// All configured pair names, sorted.
    #[must_use]
    pub fn pair_names(&self) -> Vec<String> {
        self.pairs.keys().cloned().collect()
    }
}

/// The default configuration file location
/// (`~/.config/pairsync/config.toml` on Linux).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pairsync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn storage_from_table(name: &str, mut table: toml::Table) -> Result<StorageConfig> {
    let storage_type = match table.remove("type") {
        Some(toml::Value::String(s)) => s,
        _ => {
            return Err(Error::user(format!(
                "Storage {name}: missing or non-string `type`"
            )));
        }
    };

    let mut config = StorageConfig::new(storage_type, name);
    if let Some(toml::Value::String(collection)) = table.remove("collection") {
        config.collection = Some(collection);
    }
    for (key, value) in table {
        config.set_option(key, toml_to_json(value));
    }
    Ok(config)
}

/// Convert a TOML value into the JSON value space used by storage options.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::Value::from(i),
        toml::Value::Float(f) => serde_json::Value::from(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(values) => {
            serde_json::Value::Array(values.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
