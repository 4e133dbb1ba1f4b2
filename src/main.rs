//! pairsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use pairsync::cli::{commands, report, Cli, Commands};
use pairsync::config::{self, Config};
use pairsync::error::{Error, Result};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Aborted) => ExitCode::FAILURE,
        Err(e) => {
            report::handle_cli_error(None, &e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info,reqwest=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path().ok_or_else(|| {
            Error::user("Cannot determine the configuration directory; pass --config")
        })?,
    };
    let config = Config::load(&config_path)?;

    match &cli.command {
        Commands::Check { pairs } => commands::check::execute(&config, pairs),
        Commands::Status { pair, collection } => {
            commands::status::execute(&config, pair, collection.as_deref())
        }
    }
}
