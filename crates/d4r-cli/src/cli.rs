//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use d4r_core::LocationId;

/// Mobility analysis over anonymized call detail records.
///
/// Reads folders of call records, reconstructs each caller's movement
/// between districts, and reports per-user Markov tables or cohort-split
/// call and transition statistics.
#[derive(Debug, Parser)]
#[command(name = "d4r", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write log output to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a Markov transition table for every user.
    Markov {
        #[command(flatten)]
        run: RunArgs,

        /// Also list every user's calls in time order.
        #[arg(long)]
        events: bool,
    },

    /// Compute monthly, daily, and hourly call and transition statistics.
    Stats(RunArgs),

    /// Look up the distance between two districts.
    Distance {
        /// Distances file (`from, to:km, to:km, ...` per line).
        #[arg(long)]
        distances: PathBuf,

        /// First district id.
        #[arg(allow_negative_numbers = true)]
        from: LocationId,

        /// Second district id.
        #[arg(allow_negative_numbers = true)]
        to: LocationId,
    },
}

/// Arguments shared by the commands that ingest a folder of call records.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Folder whose files are all read as call records.
    pub input: PathBuf,

    /// Write results to this file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
