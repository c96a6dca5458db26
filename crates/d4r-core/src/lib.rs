//! Core domain logic for call-detail-record mobility analysis.
//!
//! This crate contains the fundamental types and logic for:
//! - Ingestion: parsing and validating raw call records into per-user timelines
//! - Markov tables: per-user location transition probabilities
//! - Aggregation: cohort-split statistics of calls and transitions per time bucket
//! - Distances: symmetric district distance lookup

mod aggregate;
pub mod distance;
mod event;
mod histogram;
pub mod ingest;
mod markov;
pub mod temporal;
mod timeline;
mod transitions;
pub mod types;

pub use aggregate::{
    AggregateError, BucketStats, CohortSplit, MetricStats, PopulationStats, Summary, aggregate,
    aggregate_population,
};
pub use distance::{DistanceError, DistanceTable};
pub use event::EventRecord;
pub use histogram::{CalendarHistograms, Histogram};
pub use ingest::{
    FileReport, IngestConfig, IngestError, IngestSummary, IngestionPipeline, LineOutcome,
    ParsedCall, RejectReason, Rejection,
};
pub use markov::{MarkovTable, build_markov_table};
pub use temporal::{CallTime, Granularity, TemporalKey, TimeReference};
pub use timeline::{Population, UserTimeline, build_markov_tables};
pub use transitions::count_transitions;
pub use types::{Cohort, LocationId, UserId};
