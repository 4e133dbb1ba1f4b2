//! Command-line interface.

pub mod commands;
pub mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Synchronize items between pairs of storages.
#[derive(Parser, Debug)]
#[command(name = "pairsync", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, env = "PAIRSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the storages of each pair and open their status stores,
    /// creating missing collections interactively.
    Check {
        /// Pairs to check; all configured pairs when omitted.
        pairs: Vec<String>,
    },

    /// Show the recorded sync status of a pair.
    Status {
        /// Pair name.
        pair: String,
        /// Collection within the pair.
        collection: Option<String>,
    },
}
