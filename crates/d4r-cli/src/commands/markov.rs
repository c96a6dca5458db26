//! Per-user Markov transition tables.
//!
//! Text output is `user;from;to;probability` rows. With `--events` a second
//! section, after a blank line, lists every user's calls in time order as
//! `user;location;time`, with `XXXX-XX-XX XX:XX` for an unparseable time.

use std::fmt::Write as _;

use anyhow::Context;
use d4r_core::{
    Cohort, EventRecord, IngestionPipeline, LocationId, MarkovTable, Population, UserId,
    build_markov_tables,
};
use serde::Serialize;

use crate::cli::RunArgs;
use crate::commands::util;
use crate::config::Config;

#[derive(Debug, Serialize)]
struct JsonEvent {
    location: LocationId,
    time: String,
}

impl From<&EventRecord> for JsonEvent {
    fn from(event: &EventRecord) -> Self {
        Self {
            location: event.location(),
            time: event.time().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonUserTable<'a> {
    user: UserId,
    cohort: Cohort,
    calls: usize,
    events: Vec<JsonEvent>,
    transitions: &'a MarkovTable,
}

/// Ingests `args.input` and writes every user's transition table.
pub fn run(args: &RunArgs, events: bool, config: &Config) -> anyhow::Result<()> {
    let mut pipeline = IngestionPipeline::new(config.ingest_config()?);
    let failed = util::ingest_folder(&mut pipeline, &args.input)?;
    let summary = pipeline.summary();

    let mut population = pipeline.into_population();
    build_markov_tables(&mut population);

    let output = if args.json {
        format_markov_json(&population)?
    } else {
        let mut output = format_markov(&population);
        if events {
            output.push('\n');
            output.push_str(&format_events(&population));
        }
        output
    };
    util::write_output(args.out.as_deref(), &output)?;
    util::finish_run(&summary, population.len(), &failed)
}

/// Semicolon-delimited `user;from;to;probability` rows, users and states in
/// ascending id order.
pub fn format_markov(population: &Population) -> String {
    let mut output = String::new();
    writeln!(output, "user;from;to;probability").unwrap();

    for timeline in population.values() {
        let Some(table) = timeline.markov() else {
            continue;
        };
        let user = timeline.user();
        for (from, row) in table.rows() {
            for (to, probability) in row {
                writeln!(output, "{user};{from};{to};{probability}").unwrap();
            }
        }
    }
    output
}

/// Every user's calls as `user;location;time` rows, in current timeline
/// order (chronological once the tables are built).
pub fn format_events(population: &Population) -> String {
    let mut output = String::new();
    writeln!(output, "user;location;time").unwrap();

    for timeline in population.values() {
        let user = timeline.user();
        for event in timeline.events() {
            writeln!(output, "{user};{};{}", event.location(), event.time()).unwrap();
        }
    }
    output
}

pub fn format_markov_json(population: &Population) -> anyhow::Result<String> {
    let users: Vec<JsonUserTable<'_>> = population
        .values()
        .filter_map(|timeline| {
            Some(JsonUserTable {
                user: timeline.user(),
                cohort: timeline.cohort(),
                calls: timeline.call_count(),
                events: timeline.events().iter().map(JsonEvent::from).collect(),
                transitions: timeline.markov()?,
            })
        })
        .collect();
    let mut json =
        serde_json::to_string_pretty(&users).context("failed to serialize Markov tables")?;
    json.push('\n');
    Ok(json)
}
