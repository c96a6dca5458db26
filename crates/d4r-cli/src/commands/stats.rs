//! Cohort-split call and transition statistics.
//!
//! The text output is a semicolon-delimited sheet with one section per
//! granularity (monthly, daily, hourly), separated by blank lines. Each
//! section has a header row of bucket labels followed by sixteen rows:
//! mean, standard deviation, minimum and maximum, each for calls and
//! transitions, each over all users and over the refugee cohort.

use std::fmt::Write as _;

use anyhow::Context;
use chrono::Month;
use d4r_core::{
    BucketStats, Granularity, IngestionPipeline, PopulationStats, aggregate_population,
};

use crate::cli::RunArgs;
use crate::config::Config;
use crate::commands::util;

/// Ingests `args.input` and writes the population statistics.
pub fn run(args: &RunArgs, config: &Config) -> anyhow::Result<()> {
    let mut pipeline = IngestionPipeline::new(config.ingest_config()?);
    let failed = util::ingest_folder(&mut pipeline, &args.input)?;
    let summary = pipeline.summary();

    let mut population = pipeline.into_population();
    let stats = aggregate_population(&mut population).context("failed to aggregate statistics")?;

    let output = if args.json {
        format_statistics_json(&stats)?
    } else {
        format_statistics(&stats, &config.cohort_label)
    };
    util::write_output(args.out.as_deref(), &output)?;
    util::finish_run(&summary, population.len(), &failed)
}

/// Header label of one bucket.
fn bucket_label(granularity: Granularity, slot: usize) -> String {
    match granularity {
        Granularity::Monthly => u8::try_from(slot + 1)
            .ok()
            .and_then(|n| Month::try_from(n).ok())
            .map_or_else(|| slot.to_string(), |m| m.name().to_string()),
        Granularity::Daily => slot.to_string(),
        Granularity::Hourly => format!("{slot}-{}", slot + 1),
    }
}

fn section_title(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Monthly => "Monthly Statistics",
        Granularity::Daily => "Daily Statistics",
        Granularity::Hourly => "Hourly Statistics",
    }
}

fn write_row(output: &mut String, label: &str, values: &[f64]) {
    output.push_str(label);
    for value in values {
        write!(output, ";{value}").unwrap();
    }
    output.push('\n');
}

/// Renders the statistics sheet. `cohort_label` names the refugee rows.
pub fn format_statistics(stats: &PopulationStats, cohort_label: &str) -> String {
    let mut output = String::new();

    for (i, granularity) in Granularity::ALL.into_iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        output.push_str(section_title(granularity));
        for slot in 0..granularity.bucket_count() {
            write!(output, ";{}", bucket_label(granularity, slot)).unwrap();
        }
        output.push('\n');

        let metrics = stats.granularity(granularity);
        let statistics: [(&str, fn(&BucketStats) -> &[f64]); 4] = [
            ("Mean", |b| &b.mean),
            ("Std", |b| &b.std),
            ("Min", |b| &b.min),
            ("Max", |b| &b.max),
        ];
        for (name, column) in statistics {
            let metric_splits = [("Calls", &metrics.calls), ("Transitions", &metrics.transitions)];
            for (metric, split) in metric_splits {
                write_row(
                    &mut output,
                    &format!("Total {name} Number Of {metric}"),
                    column(&split.total),
                );
                write_row(
                    &mut output,
                    &format!("{cohort_label} {name} Number Of {metric}"),
                    column(&split.refugee),
                );
            }
        }
    }
    output
}

/// Renders the statistics as JSON; empty-collection values become `null`.
pub fn format_statistics_json(stats: &PopulationStats) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(stats).context("failed to serialize statistics")?;
    json.push('\n');
    Ok(json)
}
