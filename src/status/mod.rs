//! Durable per-(pair, collection) sync status.
//!
//! Two storage modes share the same path layout:
//!
//! - **Flat JSON** ([`load_status`]/[`save_status`]): a single JSON object
//!   per data type, written atomically. Used for pair metadata and as the
//!   historical format for item status.
//! - **Incremental** ([`sqlite`]): a SQLite store at the `.items` path,
//!   durable on every write. Flat-JSON item status found there is migrated
//!   in exactly once.
//!
//! Status values are opaque to this module; the sync engine owns their
//! meaning. Callers must not access the same pair/collection status
//! concurrently (one worker per pair, by construction).

pub mod paths;
pub mod permissions;
pub mod sqlite;

pub use paths::{expand_path, prepare_status_path, status_name, status_path, StatusDataType};
pub use permissions::{assert_permissions, STATUS_DIR_MODE, STATUS_FILE_MODE};
pub use sqlite::{open_sync_status, SqliteStatus, StatusOpen};

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// An opaque mapping from item identifier to sync state.
pub type StatusMap = serde_json::Map<String, serde_json::Value>;

/// Load a flat-JSON status document.
///
/// Returns an empty mapping if the file is absent or unparsable; corrupted
/// status is treated as "no prior state", never as a fatal error. The file's
/// permissions are checked (and corrected) before reading.
///
/// # Errors
///
/// Returns an error only for filesystem failures such as a failed legacy
/// rename or an unreadable file.
pub fn load_status(
    base_path: &str,
    pair: &str,
    collection: Option<&str>,
    data_type: StatusDataType,
) -> Result<StatusMap> {
    let path = status_path(base_path, pair, collection, data_type)?;
    if !path.exists() {
        return Ok(StatusMap::new());
    }
    assert_permissions(&path, STATUS_FILE_MODE);

    let raw = fs::read_to_string(&path)?;
    match serde_json::from_str(&raw) {
        Ok(map) => Ok(map),
        Err(e) => {
            debug!("Discarding unparsable status at {}: {e}", path.display());
            Ok(StatusMap::new())
        }
    }
}

/// Save a flat-JSON status document atomically.
///
/// The document is written to a temporary file in the status directory,
/// synced, and renamed over the target; on failure the temporary file is
/// cleaned up and the previous status is left untouched. The resulting file
/// is restricted to the status file permission ceiling.
///
/// # Errors
///
/// Returns an error if the directory cannot be prepared or the write fails.
pub fn save_status(
    base_path: &str,
    pair: &str,
    data_type: StatusDataType,
    data: &StatusMap,
    collection: Option<&str>,
) -> Result<()> {
    // Deliberately no legacy-rename probe here: renames happen on read
    // paths only.
    let name = status_name(pair, collection);
    let mut os = expand_path(base_path).join(name).into_os_string();
    os.push(".");
    os.push(data_type.as_str());
    let path = std::path::PathBuf::from(os);

    prepare_status_path(&path)?;
    atomic_write_json(&path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(STATUS_FILE_MODE))?;
    }

    Ok(())
}

/// Serialize `data` to `path` via a scoped temporary file in the same
/// directory, with fsync before the atomic rename.
fn atomic_write_json(path: &Path, data: &StatusMap) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut temp, data)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_status_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        let status = load_status(base, "bob", None, StatusDataType::Items).unwrap();
        assert!(status.is_empty());
    }

    #[test]
    fn test_load_status_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();
        fs::write(temp_dir.path().join("bob.items"), "not json {{{").unwrap();

        let status = load_status(base, "bob", None, StatusDataType::Items).unwrap();
        assert!(status.is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        let mut data = StatusMap::new();
        data.insert("item-1".into(), json!({"etag": "abc"}));
        data.insert("item-2".into(), json!(["href", "hash"]));

        save_status(base, "bob", StatusDataType::Items, &data, None).unwrap();
        let loaded = load_status(base, "bob", None, StatusDataType::Items).unwrap();
        assert_eq!(loaded, data);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_status_sets_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        save_status(base, "bob", StatusDataType::Items, &StatusMap::new(), None).unwrap();
        let mode = fs::metadata(temp_dir.path().join("bob.items"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_save_status_with_collection_creates_pair_dir() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        save_status(
            base,
            "bob",
            StatusDataType::Metadata,
            &StatusMap::new(),
            Some("cal"),
        )
        .unwrap();
        assert!(temp_dir.path().join("bob/cal.metadata").is_file());
    }

    #[test]
    fn test_load_status_reads_legacy_renamed_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();
        let mut data = StatusMap::new();
        data.insert("item-1".into(), json!("state"));
        fs::write(
            temp_dir.path().join("bob"),
            serde_json::to_string(&data).unwrap(),
        )
        .unwrap();

        let loaded = load_status(base, "bob", None, StatusDataType::Items).unwrap();
        assert_eq!(loaded, data);
        assert!(temp_dir.path().join("bob.items").is_file());
    }
}
