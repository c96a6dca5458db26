//! CLI subcommand implementations.

pub mod distance;
pub mod markov;
pub mod stats;
pub mod util;
