//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use d4r_core::ingest::DEFAULT_UNKNOWN_LOCATIONS;
use d4r_core::temporal::DEFAULT_TIMESTAMP_FORMAT;
use d4r_core::{IngestConfig, LocationId, TimeReference};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `chrono` layout of call timestamps.
    pub timestamp_format: String,

    /// Day-index origin, written in `timestamp_format`.
    pub reference_start: String,

    /// Field separator in call record files.
    pub delimiter: char,

    /// Leading caller-id character of the refugee cohort.
    pub refugee_marker: char,

    /// Leading caller-id character of the non-refugee cohort.
    pub non_refugee_marker: char,

    /// Placeholder district ids whose calls are rejected.
    pub unknown_location_ids: Vec<i64>,

    /// Row label for the refugee cohort in the statistics sheet.
    pub cohort_label: String,

    /// Where to additionally write log output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            reference_start: "01-01-2017 00:00".to_string(),
            delimiter: ',',
            refugee_marker: '1',
            non_refugee_marker: '2',
            unknown_location_ids: DEFAULT_UNKNOWN_LOCATIONS.to_vec(),
            cohort_label: "Refugee".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (D4R_*)
        figment = figment.merge(Env::prefixed("D4R_"));

        figment.extract()
    }

    /// Builds the core ingestion rules, validating the reference start.
    pub fn ingest_config(&self) -> anyhow::Result<IngestConfig> {
        let reference = TimeReference::parse(&self.timestamp_format, &self.reference_start)
            .with_context(|| {
                format!(
                    "reference_start {:?} does not match timestamp_format {:?}",
                    self.reference_start, self.timestamp_format
                )
            })?;
        if self.refugee_marker == self.non_refugee_marker {
            anyhow::bail!(
                "refugee_marker and non_refugee_marker must differ (both {:?})",
                self.refugee_marker
            );
        }
        Ok(IngestConfig {
            delimiter: self.delimiter,
            reference,
            refugee_marker: self.refugee_marker,
            non_refugee_marker: self.non_refugee_marker,
            unknown_locations: self
                .unknown_location_ids
                .iter()
                .copied()
                .map(LocationId::new)
                .collect(),
        })
    }
}

/// Returns the platform-specific config directory for d4r.
///
/// On Linux: `~/.config/d4r`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("d4r"))
}
