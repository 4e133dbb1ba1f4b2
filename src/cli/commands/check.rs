//! The `check` command: resolve every storage of the requested pairs and
//! open their status stores, driving collection recovery where needed.
//!
//! Failures are reported per pair through the error boundary and the run
//! continues with the next pair; the command still fails overall when any
//! pair failed, so the process exits nonzero.

use colored::Colorize;
use tracing::info;

use crate::cli::report::handle_cli_error;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::status::{open_sync_status, status_name, StatusOpen};
use crate::storage::{instance_from_config, Connector};
use crate::ui::{ConfirmationService, TerminalConfirmation};

pub fn execute(config: &Config, pairs: &[String]) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, pairs, &TerminalConfirmation))
}

async fn run(config: &Config, pairs: &[String], ui: &dyn ConfirmationService) -> Result<()> {
    let connector = Connector::new();

    let names = if pairs.is_empty() {
        config.pair_names()
    } else {
        pairs.to_vec()
    };

    let mut failed = 0_usize;
    for name in &names {
        match check_pair(config, name, &connector, ui).await {
            Ok(()) => println!("{} {name}", "ok".green().bold()),
            Err(e) => {
                handle_cli_error(Some(name), &e);
                println!("{} {name}", "failed".red().bold());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(Error::user(format!(
            "{failed} out of {} pairs failed",
            names.len()
        )));
    }
    Ok(())
}

async fn check_pair(
    config: &Config,
    name: &str,
    connector: &Connector,
    ui: &dyn ConfirmationService,
) -> Result<()> {
    let pair = config.pair(name)?;
    let collections: Vec<Option<String>> = match &pair.collections {
        Some(collections) => collections.iter().cloned().map(Some).collect(),
        None => vec![None],
    };

    for collection in collections {
        for side in [&pair.a, &pair.b] {
            let mut storage_config = config.storage(side)?.clone();
            if let Some(collection) = &collection {
                storage_config.collection = Some(collection.clone());
            }
            let storage = instance_from_config(&storage_config, true, connector, ui).await?;
            info!(
                storage = storage.instance_name(),
                read_only = storage.read_only(),
                "storage ready"
            );
        }

        let (store, outcome) = open_sync_status(&config.status_path, name, collection.as_deref())?;
        let scope = status_name(name, collection.as_deref());
        match outcome {
            StatusOpen::Fresh => info!("{scope}: no previous sync status"),
            StatusOpen::Existing => {
                info!("{scope}: status for {} items", store.len()?);
            }
            StatusOpen::MigratedFromLegacy(count) => {
                info!("{scope}: migrated {count} legacy status entries");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::ScriptedConfirmation;
    use tempfile::TempDir;

    fn sample_config(status: &TempDir, items: &TempDir) -> Config {
        Config::from_toml(&format!(
            r#"
            [general]
            status_path = "{}"

            [storages.local]
            type = "filesystem"
            path = "{}"
            fileext = ".ics"

            [storages.broken]
            type = "bogus"

            [pairs.good]
            a = "local"
            b = "local"

            [pairs.bad]
            a = "broken"
            b = "broken"
            "#,
            status.path().display(),
            items.path().display()
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_succeeds_when_all_pairs_pass() {
        let status = TempDir::new().unwrap();
        let items = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::answering(false);

        run(&sample_config(&status, &items), &["good".into()], &ui)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_fails_when_any_pair_fails() {
        let status = TempDir::new().unwrap();
        let items = TempDir::new().unwrap();
        let ui = ScriptedConfirmation::answering(false);

        let err = run(
            &sample_config(&status, &items),
            &["good".into(), "bad".into()],
            &ui,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "1 out of 2 pairs failed");
    }
}
