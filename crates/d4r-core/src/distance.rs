//! District-to-district distance lookup.
//!
//! The distances file stores each unordered pair once:
//!
//! ```text
//! 1, 2:12.5, 3:40
//! 2, 3:31.2
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::LocationId;

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Symmetric distance lookup between districts.
#[derive(Debug, Clone, Default)]
pub struct DistanceTable {
    entries: HashMap<LocationId, HashMap<LocationId, f64>>,
}

impl DistanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the distance from `from` to `to`. Lookups work in either
    /// direction.
    pub fn insert(&mut self, from: LocationId, to: LocationId, km: f64) {
        self.entries.entry(from).or_default().insert(to, km);
    }

    /// Distance between two districts: zero for the same district, `None`
    /// when neither ordering of the pair is known.
    pub fn distance(&self, a: LocationId, b: LocationId) -> Option<f64> {
        if a == b {
            return Some(0.0);
        }
        let lookup = |x: LocationId, y: LocationId| self.entries.get(&x)?.get(&y).copied();
        lookup(a, b).or_else(|| lookup(b, a))
    }

    /// Number of stored (one-directional) pairs.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads a distances file.
    pub fn load(path: &Path) -> Result<Self, DistanceError> {
        let io_error = |source| DistanceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        Self::from_reader(BufReader::new(file)).map_err(io_error)
    }

    /// Parses distances from `reader`.
    ///
    /// Malformed entries are logged and skipped; only read failures are
    /// errors.
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut table = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = idx + 1;
            let fields: Vec<&str> = line
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect();
            let [from, rest @ ..] = fields.as_slice() else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            let Ok(from) = from.parse::<LocationId>() else {
                tracing::warn!(
                    line = line_number,
                    id = from,
                    "skipping distance row with non-numeric id"
                );
                continue;
            };

            for entry in rest {
                match parse_entry(entry) {
                    Some((to, km)) => table.insert(from, to, km),
                    None => tracing::warn!(
                        line = line_number,
                        entry,
                        "skipping malformed distance entry"
                    ),
                }
            }
        }

        tracing::debug!(pairs = table.len(), "loaded distance table");
        Ok(table)
    }
}

/// Parses `id:km`; distances must be finite and non-negative.
fn parse_entry(entry: &str) -> Option<(LocationId, f64)> {
    let (to, km) = entry.split_once(':')?;
    let to = to.trim().parse().ok()?;
    let km: f64 = km.trim().parse().ok()?;
    (km.is_finite() && km >= 0.0).then_some((to, km))
}
