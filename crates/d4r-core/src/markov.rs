//! Per-user first-order Markov transition tables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::event::EventRecord;
use crate::types::LocationId;

/// Transition probabilities from each visited location.
///
/// Every row is normalised by the number of visits to its source location,
/// so it sums to 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MarkovTable {
    rows: BTreeMap<LocationId, BTreeMap<LocationId, f64>>,
}

impl MarkovTable {
    /// Distribution over next locations given `from`.
    pub fn row(&self, from: LocationId) -> Option<&BTreeMap<LocationId, f64>> {
        self.rows.get(&from)
    }

    /// Probability of moving from `from` to `to`; zero if never observed.
    pub fn probability(&self, from: LocationId, to: LocationId) -> f64 {
        self.row(from)
            .and_then(|row| row.get(&to))
            .copied()
            .unwrap_or(0.0)
    }

    /// Rows in ascending source-location order.
    pub fn rows(&self) -> impl Iterator<Item = (LocationId, &BTreeMap<LocationId, f64>)> {
        self.rows.iter().map(|(from, row)| (*from, row))
    }

    /// Number of distinct source locations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Builds the transition table for one user's sorted call sequence.
///
/// The next state of the call at position `i` is the location at `i + 1`.
/// The final call of the sequence has no successor and is credited as a
/// self-loop, so its location's row still sums to 1.0.
pub fn build_markov_table(events: &[EventRecord]) -> MarkovTable {
    let mut tallies: BTreeMap<LocationId, (u32, BTreeMap<LocationId, u32>)> = BTreeMap::new();

    for (i, event) in events.iter().enumerate() {
        let from = event.location();
        let to = events.get(i + 1).map_or(from, EventRecord::location);
        let (visits, next) = tallies.entry(from).or_default();
        *visits += 1;
        *next.entry(to).or_insert(0) += 1;
    }

    let rows = tallies
        .into_iter()
        .map(|(from, (visits, next))| {
            let row = next
                .into_iter()
                .map(|(to, count)| (to, f64::from(count) / f64::from(visits)))
                .collect();
            (from, row)
        })
        .collect();

    MarkovTable { rows }
}
