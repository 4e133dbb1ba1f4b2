//! Incremental sync status store backed by SQLite.
//!
//! One database per (pair, collection) at the canonical `.items` path. Every
//! write is durably visible before the call returns (`synchronous=FULL`), so
//! a crash mid-sync loses at most the in-flight item. Flat-JSON legacy
//! status found at the same path is imported exactly once and the legacy
//! file deleted.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use super::paths::{prepare_status_path, status_path, StatusDataType};
use super::StatusMap;
use crate::error::Result;

/// How a sync status store was opened.
///
/// Exposed so callers and tests can observe which path was taken instead of
/// inferring it from side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOpen {
    /// No status existed; a new empty store was created.
    Fresh,
    /// An incremental store already existed at the path.
    Existing,
    /// A flat-JSON legacy file was found, imported (with the given entry
    /// count) and deleted.
    MigratedFromLegacy(usize),
}

/// Keyed store of opaque per-item sync state.
#[derive(Debug)]
pub struct SqliteStatus {
    conn: Connection,
}

impl SqliteStatus {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // Durability over speed: status writes must survive a crash.
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS status (
                ident TEXT PRIMARY KEY,
                payload TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Fetch the state blob for one item.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored payload is not
    /// valid JSON.
    pub fn get(&self, ident: &str) -> Result<Option<serde_json::Value>> {
        let payload: Option<String> = self
            .conn
            .query_row("SELECT payload FROM status WHERE ident = ?1", [ident], |row| {
                row.get(0)
            })
            .optional()?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the state blob for one item. Durable on return.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn insert(&self, ident: &str, payload: &serde_json::Value) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO status (ident, payload) VALUES (?1, ?2)",
            rusqlite::params![ident, serde_json::to_string(payload)?],
        )?;
        Ok(())
    }

    /// Remove one item's state. Removing an absent item is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn remove(&self, ident: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM status WHERE ident = ?1", [ident])?;
        Ok(())
    }

    /// All item identifiers, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn idents(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ident FROM status ORDER BY ident")?;
        let idents = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(idents)
    }

    /// Number of items with recorded state.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM status", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether the store has no recorded state.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// One-time import of a legacy flat-JSON status document.
    ///
    /// Runs in a single transaction and returns the number of imported
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the import transaction fails.
    pub fn load_legacy(&mut self, legacy: &StatusMap) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO status (ident, payload) VALUES (?1, ?2)")?;
            for (ident, payload) in legacy {
                stmt.execute(rusqlite::params![ident, serde_json::to_string(payload)?])?;
            }
        }
        tx.commit()?;
        Ok(legacy.len())
    }
}

/// Open the incremental sync status for a pair/collection, migrating a
/// flat-JSON legacy file in place if one is found.
///
/// The returned [`StatusOpen`] tag reports which path was taken. A failure
/// to read or parse a suspected legacy file never blocks opening; it falls
/// through to fresh/incremental creation (with a warning if the file
/// actually existed, since that may indicate corruption).
///
/// # Errors
///
/// Returns an error if path resolution, directory preparation, legacy file
/// removal or store creation fails.
pub fn open_sync_status(
    base_path: &str,
    pair: &str,
    collection: Option<&str>,
) -> Result<(SqliteStatus, StatusOpen)> {
    let path = status_path(base_path, pair, collection, StatusDataType::Items)?;

    if let Some(legacy) = peek_legacy_status(&path) {
        warn!("Migrating legacy status to sqlite: {}", path.display());
        fs::remove_file(&path)?;
        let mut store = SqliteStatus::open(&path)?;
        let imported = store.load_legacy(&legacy)?;
        return Ok((store, StatusOpen::MigratedFromLegacy(imported)));
    }

    prepare_status_path(&path)?;
    let existed = path.exists();
    let store = SqliteStatus::open(&path)?;
    let outcome = if existed {
        StatusOpen::Existing
    } else {
        StatusOpen::Fresh
    };
    Ok((store, outcome))
}

/// Peek the first byte of `path`; if it is `{`, parse the whole file as a
/// legacy flat-JSON status document.
///
/// Any failure yields `None` so that migration can never block normal
/// operation, but failures on a file that demonstrably exists are logged:
/// they may be masking a corrupted incremental store.
fn peek_legacy_status(path: &Path) -> Option<StatusMap> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Could not inspect status file {}: {e}", path.display());
            return None;
        }
    };

    let mut first = [0_u8; 1];
    match file.read_exact(&mut first) {
        Ok(()) if first[0] == b'{' => {}
        Ok(()) => return None,
        // Zero-length file; treat as no prior state.
        Err(_) => return None,
    }

    let parsed = file
        .seek(SeekFrom::Start(0))
        .map_err(crate::Error::from)
        .and_then(|_| {
            let mut raw = String::new();
            file.read_to_string(&mut raw)?;
            Ok(serde_json::from_str::<StatusMap>(&raw)?)
        });
    match parsed {
        Ok(map) => Some(map),
        Err(e) => {
            warn!(
                "Status file {} looks like legacy JSON but could not be read ({e}); \
                 treating it as no prior state",
                path.display()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        let (store, outcome) = open_sync_status(base, "bob", Some("cal")).unwrap();
        assert_eq!(outcome, StatusOpen::Fresh);
        assert!(store.is_empty().unwrap());

        store.insert("item-1", &json!({"etag": "a"})).unwrap();
        store.insert("item-2", &json!({"etag": "b"})).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get("item-1").unwrap(), Some(json!({"etag": "a"})));
        assert_eq!(store.get("absent").unwrap(), None);

        store.remove("item-1").unwrap();
        assert_eq!(store.idents().unwrap(), vec!["item-2".to_string()]);
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStatus::open(&temp_dir.path().join("x.items")).unwrap();

        store.insert("item", &json!(1)).unwrap();
        store.insert("item", &json!(2)).unwrap();
        assert_eq!(store.get("item").unwrap(), Some(json!(2)));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_reopen_is_existing() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        {
            let (store, _) = open_sync_status(base, "bob", None).unwrap();
            store.insert("item-1", &json!("state")).unwrap();
        }

        let (store, outcome) = open_sync_status(base, "bob", None).unwrap();
        assert_eq!(outcome, StatusOpen::Existing);
        assert_eq!(store.get("item-1").unwrap(), Some(json!("state")));
    }

    #[test]
    fn test_legacy_migration_runs_exactly_once() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        let mut legacy = StatusMap::new();
        legacy.insert("item-1".into(), json!(["href-a", "etag-a"]));
        legacy.insert("item-2".into(), json!(["href-b", "etag-b"]));
        fs::write(
            temp_dir.path().join("bob.items"),
            serde_json::to_string(&legacy).unwrap(),
        )
        .unwrap();

        let (store, outcome) = open_sync_status(base, "bob", None).unwrap();
        assert_eq!(outcome, StatusOpen::MigratedFromLegacy(2));
        assert_eq!(store.get("item-1").unwrap(), Some(json!(["href-a", "etag-a"])));
        assert_eq!(store.get("item-2").unwrap(), Some(json!(["href-b", "etag-b"])));
        drop(store);

        let (store, outcome) = open_sync_status(base, "bob", None).unwrap();
        assert_eq!(outcome, StatusOpen::Existing);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_legacy_migration_via_extensionless_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        let mut legacy = StatusMap::new();
        legacy.insert("item-1".into(), json!("state"));
        fs::write(
            temp_dir.path().join("bob"),
            serde_json::to_string(&legacy).unwrap(),
        )
        .unwrap();

        // The extensionless file is renamed to bob.items, then imported.
        let (store, outcome) = open_sync_status(base, "bob", None).unwrap();
        assert_eq!(outcome, StatusOpen::MigratedFromLegacy(1));
        assert_eq!(store.get("item-1").unwrap(), Some(json!("state")));
        assert!(!temp_dir.path().join("bob").exists());
    }

    #[test]
    fn test_truncated_legacy_file_is_not_imported() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();
        fs::write(temp_dir.path().join("bob.items"), "{\"item-1\": [\"trunc").unwrap();

        // The peek warns and falls through; the file is then neither valid
        // JSON nor a database, so the incremental open reports the
        // corruption instead of silently discarding the file.
        let result = open_sync_status(base, "bob", None);
        assert!(result.is_err());
        assert!(temp_dir.path().join("bob.items").exists());
    }

    #[test]
    fn test_empty_file_opens_as_existing_store() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();
        fs::write(temp_dir.path().join("bob.items"), "").unwrap();

        // SQLite treats a zero-length file as a fresh database.
        let (store, outcome) = open_sync_status(base, "bob", None).unwrap();
        assert_eq!(outcome, StatusOpen::Existing);
        assert!(store.is_empty().unwrap());
    }
}
