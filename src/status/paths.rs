//! Status path resolution.
//!
//! Status data for a pair lives under `<base>/<pair>[/<collection>]` with a
//! data-type suffix (`.items`, `.metadata`). Early releases wrote the items
//! status without any suffix; such files are renamed in place the first time
//! they are seen, before any read.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;

/// The kinds of status data kept per pair/collection, rendered as the
/// file-name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDataType {
    /// Per-item sync state (the incremental store, or the legacy flat form).
    Items,
    /// Pair-level metadata (collection discovery results and the like).
    Metadata,
}

impl StatusDataType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Metadata => "metadata",
        }
    }
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Paths without a tilde are returned unchanged, as are paths for which no
/// home directory can be determined.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(base) = directories::BaseDirs::new() {
            let home = base.home_dir();
            return if path == "~" {
                home.to_path_buf()
            } else {
                home.join(&path[2..])
            };
        }
    }
    PathBuf::from(path)
}

/// The status name of a pair, optionally scoped to one collection.
#[must_use]
pub fn status_name(pair: &str, collection: Option<&str>) -> String {
    match collection {
        Some(collection) => format!("{pair}/{collection}"),
        None => pair.to_string(),
    }
}

/// Resolve the on-disk path for a pair/collection's status data.
///
/// If an extensionless legacy file exists at the unsuffixed location and
/// `data_type` is [`StatusDataType::Items`], it is renamed to the suffixed
/// name exactly once before the path is returned.
///
/// # Errors
///
/// Returns an error if the legacy rename fails.
pub fn status_path(
    base_path: &str,
    pair: &str,
    collection: Option<&str>,
    data_type: StatusDataType,
) -> Result<PathBuf> {
    let name = status_name(pair, collection);
    let unsuffixed = expand_path(base_path).join(name);

    if unsuffixed.is_file() && data_type == StatusDataType::Items {
        // Legacy layout: the items status had no suffix.
        let new_path = with_suffix(&unsuffixed, StatusDataType::Items.as_str());
        warn!(
            "Migrating statuses: Renaming {} to {}",
            unsuffixed.display(),
            new_path.display()
        );
        fs::rename(&unsuffixed, &new_path)?;
    }

    Ok(with_suffix(&unsuffixed, data_type.as_str()))
}

/// Ensure the parent directory of a status path exists, restricted to the
/// directory permission ceiling.
///
/// An already existing directory is not an error.
///
/// # Errors
///
/// Returns any filesystem error other than "already exists".
pub fn prepare_status_path(path: &Path) -> Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(super::permissions::STATUS_DIR_MODE);
    }
    builder.create(dir)?;
    Ok(())
}

/// Append `.suffix` to a path without touching any existing dots in it.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}
