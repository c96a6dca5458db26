use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use d4r_cli::commands::{distance, markov, stats};
use d4r_cli::{Cli, Commands, Config};

/// Logs to stderr, filtered by `RUST_LOG` (or `debug` when verbose), and
/// optionally to `log_file`, which always receives warnings and rejected
/// lines.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let file_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(file_level),
            )
        }
        None => None,
    };

    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter))
        .with(file_layer)
        .try_init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(
        cli.verbose,
        cli.log_file.as_deref().or(config.log_file.as_deref()),
    )?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        Some(Commands::Markov { run, events }) => markov::run(run, *events, &config)?,
        Some(Commands::Stats(args)) => stats::run(args, &config)?,
        Some(Commands::Distance { distances, from, to }) => {
            distance::run(distances, *from, *to)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
