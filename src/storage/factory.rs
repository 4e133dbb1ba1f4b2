//! Storage construction from configuration.
//!
//! Turns a [`StorageConfig`] into a live [`Storage`] handle: resolves the
//! backend through the registry, injects the shared connector into
//! network-capable backends, drives the collection-creation recovery flow
//! at most once, and classifies raw construction failures against the
//! backend's declared parameter schema.

use tracing::{error, warn};

use super::registry::{self, StorageType};
use super::{Connector, Storage, StorageBackend, StorageConfig};
use crate::error::{Error, Result};
use crate::ui::ConfirmationService;

/// Resolve the backend a configuration refers to.
///
/// # Errors
///
/// Returns the unknown-storage-type user error if the configured type is
/// outside the closed set.
pub fn backend_from_config(config: &StorageConfig) -> Result<&'static dyn StorageBackend> {
    let storage_type = StorageType::from_name(&config.storage_type)?;
    Ok(registry::resolve(storage_type))
}

/// Build a live storage handle from configuration.
///
/// With `create` set, a missing collection triggers the interactive
/// recovery flow once; construction is then retried exactly once with the
/// updated configuration and creation disabled, so recovery can never loop.
/// On failure the result is always one of the closed error kinds, never a
/// raw construction error.
///
/// # Errors
///
/// - [`Error::User`] for unknown types, parameter-schema violations, and
///   declined or impossible collection creation
/// - [`Error::Aborted`] when the user cancels the recovery prompt
/// - [`Error::CollectionNotFound`] when the collection is missing and
///   `create` is false
/// - whatever the backend reported, if the parameter schema was satisfied
pub async fn instance_from_config(
    config: &StorageConfig,
    create: bool,
    connector: &Connector,
    ui: &dyn ConfirmationService,
) -> Result<Box<dyn Storage>> {
    let mut config = config.clone();
    let mut create = create;

    loop {
        let backend = backend_from_config(&config)?;

        let mut open_config = config.clone();
        if backend.uses_connector() {
            open_config.set_connector(connector.clone());
        }

        match backend.open(open_config).await {
            Ok(storage) => return Ok(storage),
            Err(Error::CollectionNotFound { collection, storage }) if create => {
                config = handle_collection_not_found(&config, &collection, &storage, ui).await?;
                create = false;
            }
            Err(e @ Error::CollectionNotFound { .. }) => return Err(e),
            Err(e) => return Err(classify_init_error(backend, &config, e)),
        }
    }
}

/// Recovery flow for a missing collection.
///
/// Asks the injected confirmation service whether the collection should be
/// created; on approval, calls the backend's creation capability and
/// returns the updated configuration. The caller's configuration is never
/// mutated, so a declined or aborted recovery leaves no partial state.
async fn handle_collection_not_found(
    config: &StorageConfig,
    collection: &str,
    storage: &str,
    ui: &dyn ConfirmationService,
) -> Result<StorageConfig> {
    warn!("No collection {collection:?} found for storage {storage}.");

    if ui.confirm("Should pairsync attempt to create it?").await? {
        let backend = backend_from_config(config)?;
        match backend.create_collection(config).await {
            Ok(updated) => return Ok(updated),
            Err(e @ Error::CollectionCreateUnsupported { .. }) => {
                error!("{e}");
                // Fall through to the manual-creation message below.
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::user(format!(
        "Unable to find or create collection \"{collection}\" for storage \
         \"{storage}\". Please create the collection yourself."
    )))
}

/// Translate a raw construction failure into an actionable configuration
/// error where the parameter schema explains it.
///
/// Computes `missing = required - given` and `invalid = given - allowed`
/// against the backend's declared schema; if either set is non-empty the
/// failure becomes a user error listing exactly those parameter names. If
/// both sets are empty the parameters were not the problem and the
/// original failure is returned unchanged.
fn classify_init_error(
    backend: &dyn StorageBackend,
    config: &StorageConfig,
    original: Error,
) -> Error {
    let (missing, invalid) = config.missing_and_invalid(&backend.parameters());
    if missing.is_empty() && invalid.is_empty() {
        return original;
    }

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!(
            "{} storage requires the parameters: {}",
            backend.storage_name(),
            missing.join(", ")
        ));
    }
    if !invalid.is_empty() {
        problems.push(format!(
            "{} storage doesn't take the parameters: {}",
            backend.storage_name(),
            invalid.join(", ")
        ));
    }

    Error::User {
        message: format!("Failed to initialize {}", config.instance_name),
        problems,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::ScriptedConfirmation;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn filesystem_config(root: &std::path::Path, collection: Option<&str>) -> StorageConfig {
        let mut config = StorageConfig::new("filesystem", "my_calendar")
            .with_option("path", root.to_str().unwrap())
            .with_option("fileext", ".ics");
        config.collection = collection.map(ToString::to_string);
        config
    }

    #[test]
    fn test_unknown_storage_type() {
        let config = StorageConfig::new("bogus", "my_storage");
        let err = backend_from_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "Unknown storage type: bogus");
    }

    #[tokio::test]
    async fn test_build_existing_storage() {
        let temp_dir = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::answering(true);

        let storage = instance_from_config(
            &filesystem_config(temp_dir.path(), None),
            true,
            &Connector::default(),
            &ui,
        )
        .await
        .unwrap();
        assert_eq!(storage.instance_name(), "my_calendar");
        // No recovery needed, so no question asked.
        assert_eq!(ui.asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recovery_creates_collection_once() {
        let temp_dir = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::answering(true);

        let storage = instance_from_config(
            &filesystem_config(temp_dir.path(), Some("work")),
            true,
            &Connector::default(),
            &ui,
        )
        .await
        .unwrap();
        assert_eq!(storage.instance_name(), "my_calendar");
        assert!(temp_dir.path().join("work").is_dir());
        assert_eq!(ui.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_declined_recovery_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::answering(false);

        let err = instance_from_config(
            &filesystem_config(temp_dir.path(), Some("work")),
            true,
            &Connector::default(),
            &ui,
        )
        .await
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("work"));
        assert!(text.contains("my_calendar"));
        assert!(!temp_dir.path().join("work").exists());
        assert_eq!(ui.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_aborted_recovery_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::aborting();

        let err = instance_from_config(
            &filesystem_config(temp_dir.path(), Some("work")),
            true,
            &Connector::default(),
            &ui,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Aborted));
        assert!(!temp_dir.path().join("work").exists());
    }

    #[tokio::test]
    async fn test_no_create_propagates_collection_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::answering(true);

        let err = instance_from_config(
            &filesystem_config(temp_dir.path(), Some("work")),
            false,
            &Connector::default(),
            &ui,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::CollectionNotFound { .. }));
        assert_eq!(ui.asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_creation_falls_back_to_user_error() {
        // http has no create_collection capability.
        let config = StorageConfig::new("http", "my_remote").with_option("url", "http://x/items");
        let ui = ScriptedConfirmation::answering(true);

        let err = handle_collection_not_found(&config, "work", "my_remote", &ui)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::User { .. }));
        assert!(err.to_string().contains("create the collection yourself"));
    }

    #[tokio::test]
    async fn test_missing_and_invalid_parameters_are_classified() {
        let temp_dir = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::answering(true);
        // `fileext` missing, `url` not accepted by filesystem.
        let config = StorageConfig::new("filesystem", "my_calendar")
            .with_option("path", temp_dir.path().to_str().unwrap())
            .with_option("url", "http://x");

        let err = instance_from_config(&config, true, &Connector::default(), &ui)
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Failed to initialize my_calendar"));
        assert!(text.contains("filesystem storage requires the parameters: fileext"));
        assert!(text.contains("filesystem storage doesn't take the parameters: url"));
    }

    #[tokio::test]
    async fn test_satisfied_schema_passes_original_error_through() {
        let temp_dir = TempDir::new().unwrap();
        let backend = backend_from_config(&filesystem_config(temp_dir.path(), None)).unwrap();

        let original = Error::Other("backend exploded".into());
        let classified = classify_init_error(
            backend,
            &filesystem_config(temp_dir.path(), None),
            original,
        );
        assert!(matches!(classified, Error::Other(_)));
    }
}
