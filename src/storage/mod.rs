//! Storage abstraction: items, backend traits, registry and factory.
//!
//! A *storage* is a live handle over a concrete backend capable of listing,
//! fetching and storing items. A *backend* is the process-wide
//! implementation of one storage type; it knows how to construct storages
//! from configuration and, where supported, how to create missing
//! collections.
//!
//! # Submodules
//!
//! - [`config`] - The explicit configuration value type
//! - [`registry`] - Closed storage-type set with resolve-once lazy linking
//! - [`factory`] - Configuration to live handle, with recovery and error
//!   classification
//! - [`filesystem`], [`singlefile`], [`http`] - Built-in backends

pub mod config;
pub mod factory;
pub mod filesystem;
pub mod http;
pub mod registry;
pub mod singlefile;

pub use config::StorageConfig;
pub use factory::{backend_from_config, instance_from_config};
pub use registry::{resolve, StorageType};

use std::fmt::Debug;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Shared connection pool injected into network-backed storages. Externally
/// owned; this subsystem never closes or reconfigures it.
pub type Connector = reqwest::Client;

/// A single synchronizable item: an identifier plus opaque content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    ident: String,
    content: String,
}

impl Item {
    #[must_use]
    pub fn new(ident: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content fingerprint used as the item's etag.
    #[must_use]
    pub fn etag(&self) -> String {
        content_etag(&self.content)
    }
}

/// SHA256 fingerprint of item content, hex-encoded.
#[must_use]
pub fn content_etag(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Declared parameter schema of a backend.
///
/// `allowed` is the full set of accepted option keys and always contains
/// `required`. Validation is a structured set comparison against these,
/// never error-text parsing.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub required: &'static [&'static str],
    pub allowed: &'static [&'static str],
}

/// A live storage handle.
///
/// List/fetch/store contract consumed by the sync engine. Etags are opaque
/// change markers; two listings with equal etags hold equal content.
#[async_trait]
pub trait Storage: Send + Debug {
    /// The configured instance name, used in user-facing messages.
    fn instance_name(&self) -> &str;

    /// Whether writes are rejected. Read-only storages fail mutations with
    /// a partial-sync error.
    fn read_only(&self) -> bool {
        false
    }

    /// List all items as `(ident, etag)` pairs.
    async fn list(&self) -> Result<Vec<(String, String)>>;

    /// Fetch one item by identifier.
    async fn get(&self, ident: &str) -> Result<Item>;

    /// Store a new item, returning its etag. Fails if the identifier
    /// already exists.
    async fn upload(&mut self, item: &Item) -> Result<String>;

    /// Delete one item by identifier.
    async fn delete(&mut self, ident: &str) -> Result<()>;
}

/// Process-wide implementation of one storage type.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// The type name this backend registers under. Must match the registry
    /// tag it is linked from.
    fn storage_name(&self) -> &'static str;

    /// Declared parameter schema for configuration validation.
    fn parameters(&self) -> ParamSpec;

    /// Whether the factory should inject the shared connector.
    fn uses_connector(&self) -> bool {
        false
    }

    /// Construct a storage from configuration. May perform network I/O.
    ///
    /// Fails with [`Error::CollectionNotFound`] when the configured
    /// collection does not exist; the factory drives recovery from that.
    async fn open(&self, config: StorageConfig) -> Result<Box<dyn Storage>>;

    /// Create the configured collection and return the updated
    /// configuration. Unimplemented by default.
    async fn create_collection(&self, config: &StorageConfig) -> Result<StorageConfig> {
        let _ = config;
        Err(Error::CollectionCreateUnsupported {
            storage_type: self.storage_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_etag_is_content_hash() {
        let a = Item::new("uid-1", "BEGIN:VCARD");
        let b = Item::new("uid-2", "BEGIN:VCARD");
        assert_eq!(a.etag(), b.etag());
        assert_eq!(a.etag().len(), 64);

        let c = Item::new("uid-1", "BEGIN:VCALENDAR");
        assert_ne!(a.etag(), c.etag());
    }
}
