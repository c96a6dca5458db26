//! Line parsing, validation and routing of call records into timelines.
//!
//! Each raw line is `caller,timestamp,location[,city...]`. The first
//! character of the caller field is a cohort marker and the rest is the
//! numeric user id. Every line produces an explicit [`LineOutcome`]; a bad
//! line never stops the file.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::event::EventRecord;
use crate::temporal::{Granularity, TemporalKey, TimeReference};
use crate::timeline::{Population, UserTimeline};
use crate::types::{Cohort, LocationId, UserId};

/// Buffer size for `BufReader` (64KB, CDR dumps are large).
const BUFFER_SIZE: usize = 64 * 1024;

const CALLER_FIELD: usize = 0;
const TIME_FIELD: usize = 1;
const LOCATION_FIELD: usize = 2;
const REQUIRED_FIELDS: usize = 3;

/// District ids used as placeholders for unknown locations.
pub const DEFAULT_UNKNOWN_LOCATIONS: [i64; 3] = [738, 762, 776];

/// Parsing and validation rules for raw call records.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Field separator.
    pub delimiter: char,
    /// Timestamp layout and day-index origin.
    pub reference: TimeReference,
    /// Leading caller-id character marking a refugee.
    pub refugee_marker: char,
    /// Leading caller-id character marking a non-refugee.
    pub non_refugee_marker: char,
    /// Locations whose calls are rejected.
    pub unknown_locations: BTreeSet<LocationId>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            reference: TimeReference::default(),
            refugee_marker: '1',
            non_refugee_marker: '2',
            unknown_locations: DEFAULT_UNKNOWN_LOCATIONS
                .into_iter()
                .map(LocationId::new)
                .collect(),
        }
    }
}

/// Why a line was not ingested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The line has too few fields.
    #[error("expected at least {expected} fields, found {found}")]
    MissingFields { expected: usize, found: usize },

    /// A numeric field did not parse.
    #[error("non-numeric {field}: {value:?}")]
    NonNumeric { field: &'static str, value: String },

    /// The location is one of the unknown placeholders.
    #[error("unknown location id {0}")]
    UnknownLocation(LocationId),

    /// The caller id does not start with a cohort marker.
    #[error("caller id {0:?} does not start with a cohort marker")]
    InvalidCohortMarker(String),

    /// The timestamp does not match the expected layout.
    #[error("unparseable timestamp {0:?}")]
    InvalidTimestamp(String),

    /// The timestamp parsed but lies outside the 365-day histogram.
    #[error("timestamp {timestamp:?} is {day_index} days from the reference origin")]
    OutsideReferenceYear { timestamp: String, day_index: u32 },
}

impl RejectReason {
    /// Structural problems mean the line could not be read at all, as
    /// opposed to a readable line failing a field check.
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::MissingFields { .. } | Self::NonNumeric { .. })
    }
}

/// A line that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub user: UserId,
    pub cohort: Cohort,
    pub event: EventRecord,
}

/// Result of parsing one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Whitespace only; not counted as processed.
    Blank,
    Accepted(ParsedCall),
    /// Every reason the line failed, in check order.
    Rejected(Vec<RejectReason>),
}

/// A rejected line and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// 1-based physical line number.
    pub line: usize,
    pub reasons: Vec<RejectReason>,
}

/// Outcome of ingesting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Name the lines were read from, for logs.
    pub source: String,
    /// Non-blank lines seen.
    pub lines_processed: usize,
    pub accepted: usize,
    pub rejections: Vec<Rejection>,
}

impl FileReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            lines_processed: 0,
            accepted: 0,
            rejections: Vec::new(),
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

/// Running totals across every ingested file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub files: usize,
    pub lines_processed: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Errors that stop ingestion of a whole file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parses call records and routes them into per-user timelines.
///
/// The pipeline owns every [`UserTimeline`]; a timeline is created the first
/// time its user is accepted, with that line's cohort.
#[derive(Debug, Default)]
pub struct IngestionPipeline {
    config: IngestConfig,
    population: Population,
    summary: IngestSummary,
}

impl IngestionPipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            population: Population::new(),
            summary: IngestSummary::default(),
        }
    }

    /// Parses and validates one line without touching any timeline.
    ///
    /// Structural failures (too few fields, non-numeric ids) short-circuit
    /// with a single reason. Otherwise the location, cohort marker and
    /// timestamp are each checked and every failure is reported.
    pub fn parse_line(&self, raw: &str) -> LineOutcome {
        let line = raw.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            return LineOutcome::Blank;
        }

        let fields: Vec<&str> = line.split(self.config.delimiter).map(str::trim).collect();
        if fields.len() < REQUIRED_FIELDS {
            return LineOutcome::Rejected(vec![RejectReason::MissingFields {
                expected: REQUIRED_FIELDS,
                found: fields.len(),
            }]);
        }

        let caller = fields[CALLER_FIELD];
        let raw_time = fields[TIME_FIELD];
        let raw_location = fields[LOCATION_FIELD];

        let Ok(location) = raw_location.parse::<LocationId>() else {
            return LineOutcome::Rejected(vec![RejectReason::NonNumeric {
                field: "location id",
                value: raw_location.to_string(),
            }]);
        };

        let mut chars = caller.chars();
        let marker = chars.next();
        let Ok(user) = chars.as_str().parse::<UserId>() else {
            return LineOutcome::Rejected(vec![RejectReason::NonNumeric {
                field: "caller id",
                value: caller.to_string(),
            }]);
        };

        let mut reasons = Vec::new();

        if self.config.unknown_locations.contains(&location) {
            reasons.push(RejectReason::UnknownLocation(location));
        }

        let cohort = marker.and_then(|m| self.cohort_for(m));
        if cohort.is_none() {
            reasons.push(RejectReason::InvalidCohortMarker(caller.to_string()));
        }

        let time = TemporalKey::parse(raw_time, &self.config.reference);
        match time.call_time() {
            None => reasons.push(RejectReason::InvalidTimestamp(raw_time.to_string())),
            Some(t) if Granularity::Daily.slot(t).is_none() => {
                reasons.push(RejectReason::OutsideReferenceYear {
                    timestamp: raw_time.to_string(),
                    day_index: t.day_index(),
                });
            }
            Some(_) => {}
        }

        match cohort {
            Some(cohort) if reasons.is_empty() => LineOutcome::Accepted(ParsedCall {
                user,
                cohort,
                event: EventRecord::new(location, time),
            }),
            _ => LineOutcome::Rejected(reasons),
        }
    }

    fn cohort_for(&self, marker: char) -> Option<Cohort> {
        if marker == self.config.refugee_marker {
            Some(Cohort::Refugee)
        } else if marker == self.config.non_refugee_marker {
            Some(Cohort::NonRefugee)
        } else {
            None
        }
    }

    /// Appends an accepted call to its user's timeline, creating the
    /// timeline on first sight.
    pub fn accept(&mut self, call: ParsedCall) {
        let ParsedCall {
            user,
            cohort,
            event,
        } = call;
        self.population
            .entry(user)
            .or_insert_with(|| {
                tracing::trace!(%user, %cohort, "new user");
                UserTimeline::new(user, cohort)
            })
            .add_event(event);
    }

    /// Ingests every line from `reader`.
    ///
    /// Only a read failure ends the file early; invalid UTF-8 is decoded
    /// lossily and handled like any other bad line. Accepted calls are
    /// routed into timelines only once the whole reader has been consumed,
    /// so a failed read leaves the population and summary untouched.
    pub fn ingest_reader<R: BufRead>(
        &mut self,
        mut reader: R,
        source: &str,
    ) -> std::io::Result<FileReport> {
        let mut report = FileReport::new(source);
        let mut staged = Vec::new();
        let mut buf = Vec::new();
        let mut line_number = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_number += 1;
            let line = String::from_utf8_lossy(&buf);

            match self.parse_line(&line) {
                LineOutcome::Blank => continue,
                LineOutcome::Accepted(call) => staged.push(call),
                LineOutcome::Rejected(reasons) => {
                    log_rejection(source, line_number, &line, &reasons);
                    report.rejections.push(Rejection {
                        line: line_number,
                        reasons,
                    });
                }
            }
            report.lines_processed += 1;
        }

        report.accepted = staged.len();
        for call in staged {
            self.accept(call);
        }

        self.summary.files += 1;
        self.summary.lines_processed += report.lines_processed;
        self.summary.accepted += report.accepted;
        self.summary.rejected += report.rejected();

        tracing::debug!(
            source,
            lines = report.lines_processed,
            accepted = report.accepted,
            rejected = report.rejected(),
            "finished ingesting"
        );
        Ok(report)
    }

    /// Opens and ingests the file at `path`.
    pub fn ingest_file(&mut self, path: &Path) -> Result<FileReport, IngestError> {
        let io_error = |source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let reader = BufReader::with_capacity(BUFFER_SIZE, file);
        tracing::debug!(path = %path.display(), "ingesting file");
        self.ingest_reader(reader, &path.display().to_string())
            .map_err(io_error)
    }

    pub const fn summary(&self) -> IngestSummary {
        self.summary
    }

    pub const fn population(&self) -> &Population {
        &self.population
    }

    pub fn into_population(self) -> Population {
        self.population
    }
}

fn log_rejection(source: &str, line_number: usize, raw: &str, reasons: &[RejectReason]) {
    let raw = raw.trim_end();
    for reason in reasons {
        if reason.is_structural() {
            tracing::error!(source, line = line_number, raw, %reason, "skipping malformed line");
        } else {
            tracing::warn!(source, line = line_number, raw, %reason, "rejecting line");
        }
    }
}
