//! District distance lookup.

use std::path::Path;

use d4r_core::{DistanceTable, LocationId};

pub fn run(distances: &Path, from: LocationId, to: LocationId) -> anyhow::Result<()> {
    let table = DistanceTable::load(distances)?;
    println!("{}", format_distance(&table, from, to));
    Ok(())
}

pub fn format_distance(table: &DistanceTable, from: LocationId, to: LocationId) -> String {
    table.distance(from, to).map_or_else(
        || format!("no distance known between {from} and {to}"),
        |km| format!("{km}"),
    )
}
