//! Call record analysis CLI library.
//!
//! This crate provides the CLI interface for the d4r analysis tools.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, RunArgs};
pub use config::Config;
