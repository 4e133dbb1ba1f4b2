//! The `status` command: print the recorded sync status of one
//! pair/collection.

use colored::Colorize;

use crate::config::Config;
use crate::error::Result;
use crate::status::{open_sync_status, status_name};

pub fn execute(config: &Config, pair: &str, collection: Option<&str>) -> Result<()> {
    // Validate the pair name before touching the status directory.
    config.pair(pair)?;

    let (store, _outcome) = open_sync_status(&config.status_path, pair, collection)?;
    let scope = status_name(pair, collection);
    let idents = store.idents()?;

    if idents.is_empty() {
        println!("{}", format!("{scope}: no status recorded").dimmed());
        return Ok(());
    }

    println!("{}", format!("{scope}: {} items", idents.len()).bold());
    for ident in idents {
        println!("  {ident}");
    }
    Ok(())
}
