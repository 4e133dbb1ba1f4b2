//! The explicit storage configuration value type.
//!
//! Replaces a pass-by-copy dictionary: `type`, `instance_name` and
//! `collection` are first-class fields, everything backend-specific lives
//! in the options map, and schema validation is a structured comparison
//! against the backend's declared parameter sets.

use serde_json::Value;

use super::{Connector, ParamSpec};
use crate::error::{Error, Result};

/// Declarative description of one storage instance.
///
/// Created by configuration loading; mutated only by the collection
/// recovery flow (which works on a copy and hands back the updated record).
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Storage type name (`filesystem`, `singlefile`, `http`).
    pub storage_type: String,
    /// Instance name for user-facing messages.
    pub instance_name: String,
    /// Collection within the storage, if any.
    pub collection: Option<String>,
    options: serde_json::Map<String, Value>,
    connector: Option<Connector>,
}

impl StorageConfig {
    #[must_use]
    pub fn new(storage_type: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            storage_type: storage_type.into(),
            instance_name: instance_name.into(),
            ..Self::default()
        }
    }

    /// Builder-style option setter.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.options.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// A string-valued option, or `None` if absent or not a string.
    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// A string-valued option that must be present.
    ///
    /// # Errors
    ///
    /// Returns a user error naming the parameter. The factory's
    /// classification step replaces this with the full per-schema message
    /// when the parameter is genuinely missing from the configuration.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.option_str(key).ok_or_else(|| {
            Error::user(format!(
                "storage \"{}\": missing or non-string parameter `{key}`",
                self.instance_name
            ))
        })
    }

    /// The configured option keys.
    pub fn option_keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    #[must_use]
    pub fn connector(&self) -> Option<&Connector> {
        self.connector.as_ref()
    }

    pub fn set_connector(&mut self, connector: Connector) {
        self.connector = Some(connector);
    }

    /// Compare the configured option keys against a declared schema.
    ///
    /// Returns `(missing, invalid)`: required keys not given, and given
    /// keys outside the allowed set. Both sorted.
    #[must_use]
    pub fn missing_and_invalid(&self, spec: &ParamSpec) -> (Vec<String>, Vec<String>) {
        let mut missing: Vec<String> = spec
            .required
            .iter()
            .filter(|key| !self.options.contains_key(**key))
            .map(ToString::to_string)
            .collect();
        let mut invalid: Vec<String> = self
            .options
            .keys()
            .filter(|key| !spec.allowed.contains(&key.as_str()))
            .cloned()
            .collect();
        missing.sort_unstable();
        invalid.sort_unstable();
        (missing, invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: ParamSpec = ParamSpec {
        required: &["path", "fileext"],
        allowed: &["path", "fileext", "encoding"],
    };

    #[test]
    fn test_missing_and_invalid_ok() {
        let config = StorageConfig::new("filesystem", "my_storage")
            .with_option("path", "/tmp/x")
            .with_option("fileext", ".ics");
        let (missing, invalid) = config.missing_and_invalid(&SCHEMA);
        assert!(missing.is_empty());
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_missing_and_invalid_reports_both_sets() {
        let config = StorageConfig::new("filesystem", "my_storage")
            .with_option("fileext", ".ics")
            .with_option("url", "http://example.com")
            .with_option("bogus", 1);
        let (missing, invalid) = config.missing_and_invalid(&SCHEMA);
        assert_eq!(missing, vec!["path"]);
        assert_eq!(invalid, vec!["bogus", "url"]);
    }

    #[test]
    fn test_require_str() {
        let config = StorageConfig::new("filesystem", "my_storage").with_option("path", "/tmp/x");
        assert_eq!(config.require_str("path").unwrap(), "/tmp/x");
        assert!(matches!(
            config.require_str("fileext"),
            Err(Error::User { .. })
        ));
    }
}
