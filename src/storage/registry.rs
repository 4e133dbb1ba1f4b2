//! The closed set of storage types and their backend linkage.
//!
//! Type names map to backends through a compile-time-checked enum instead
//! of a string-keyed class index. Linking is deferred to first use and
//! cached for the process lifetime, preserving the resolve-once behavior
//! without runtime module loading.

use std::fmt;
use std::sync::OnceLock;

use super::{filesystem::FilesystemBackend, http::HttpBackend, singlefile::SinglefileBackend};
use super::StorageBackend;
use crate::error::{Error, Result};

/// The known storage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Filesystem,
    Singlefile,
    Http,
}

impl StorageType {
    pub const ALL: [Self; 3] = [Self::Filesystem, Self::Singlefile, Self::Http];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Singlefile => "singlefile",
            Self::Http => "http",
        }
    }

    /// Parse a configured type name.
    ///
    /// # Errors
    ///
    /// Returns the unknown-storage-type user error for names outside the
    /// closed set.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "filesystem" => Ok(Self::Filesystem),
            "singlefile" => Ok(Self::Singlefile),
            "http" => Ok(Self::Http),
            _ => Err(Error::user(format!("Unknown storage type: {name}"))),
        }
    }

    /// Link the backend for this type. Called at most once per type.
    fn link(self) -> &'static dyn StorageBackend {
        match self {
            Self::Filesystem => &FilesystemBackend,
            Self::Singlefile => &SinglefileBackend,
            Self::Http => &HttpBackend,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static RESOLVED: [OnceLock<&'static dyn StorageBackend>; StorageType::ALL.len()] =
    [const { OnceLock::new() }; StorageType::ALL.len()];

/// Resolve a storage type to its backend.
///
/// The first resolution links the backend and asserts that its
/// self-reported name matches the tag (a mismatch is a programming error);
/// subsequent lookups are cache hits.
pub fn resolve(storage_type: StorageType) -> &'static dyn StorageBackend {
    *RESOLVED[storage_type as usize].get_or_init(|| {
        let backend = storage_type.link();
        assert_eq!(
            backend.storage_name(),
            storage_type.as_str(),
            "backend registered under the wrong storage type"
        );
        backend
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trip() {
        for storage_type in StorageType::ALL {
            assert_eq!(
                StorageType::from_name(storage_type.as_str()).unwrap(),
                storage_type
            );
        }
    }

    #[test]
    fn test_from_name_unknown() {
        let err = StorageType::from_name("bogus").unwrap_err();
        assert!(matches!(err, Error::User { .. }));
        assert_eq!(err.to_string(), "Unknown storage type: bogus");
    }

    #[test]
    fn test_resolve_names_are_consistent() {
        // Repeated resolution exercises both the linking and the cached
        // path.
        for _ in 0..2 {
            for storage_type in StorageType::ALL {
                assert_eq!(resolve(storage_type).storage_name(), storage_type.as_str());
            }
        }
    }
}
