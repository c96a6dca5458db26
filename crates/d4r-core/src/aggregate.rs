//! Population statistics over per-user calendar histograms.
//!
//! For every bucket of every granularity the engine summarises the per-user
//! counts of calls and of transitions, once over all users and once over the
//! refugee cohort. Summaries are mean, population standard deviation,
//! minimum and maximum.
//!
//! # Empty collections
//!
//! When a collection has no users (an empty refugee cohort, or no users at
//! all) every summary value for it is `NaN`. This is never an error.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::temporal::Granularity;
use crate::timeline::{Population, UserTimeline};
use crate::types::UserId;

/// Aggregation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// A timeline reached aggregation before its transitions were counted.
    #[error("transitions were not counted for user {user}")]
    TransitionsNotCounted { user: UserId },
}

/// Mean, standard deviation, minimum and maximum of one collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// The value reported for an empty collection.
    pub const EMPTY: Self = Self {
        mean: f64::NAN,
        std: f64::NAN,
        min: f64::NAN,
        max: f64::NAN,
    };
}

/// Single-pass accumulator (Welford) for [`Summary`].
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    #[allow(clippy::cast_precision_loss)]
    fn summary(&self) -> Summary {
        if self.count == 0 {
            return Summary::EMPTY;
        }
        Summary {
            mean: self.mean,
            std: (self.m2 / self.count as f64).sqrt(),
            min: self.min,
            max: self.max,
        }
    }
}

/// Per-bucket summaries, one array per statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl BucketStats {
    fn from_summaries(summaries: impl ExactSizeIterator<Item = Summary>) -> Self {
        let len = summaries.len();
        let mut stats = Self {
            mean: Vec::with_capacity(len),
            std: Vec::with_capacity(len),
            min: Vec::with_capacity(len),
            max: Vec::with_capacity(len),
        };
        for s in summaries {
            stats.mean.push(s.mean);
            stats.std.push(s.std);
            stats.min.push(s.min);
            stats.max.push(s.max);
        }
        stats
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Summary of one bucket.
    pub fn get(&self, bucket: usize) -> Option<Summary> {
        Some(Summary {
            mean: *self.mean.get(bucket)?,
            std: *self.std.get(bucket)?,
            min: *self.min.get(bucket)?,
            max: *self.max.get(bucket)?,
        })
    }
}

/// Statistics over all users and over the refugee cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSplit {
    pub total: BucketStats,
    pub refugee: BucketStats,
}

/// Call and transition statistics at one granularity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub calls: CohortSplit,
    pub transitions: CohortSplit,
}

/// Every statistic produced by one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationStats {
    /// Users aggregated.
    pub users: usize,
    /// Users in the refugee cohort.
    pub refugees: usize,
    pub hourly: MetricStats,
    pub daily: MetricStats,
    pub monthly: MetricStats,
}

impl PopulationStats {
    pub const fn granularity(&self, granularity: Granularity) -> &MetricStats {
        match granularity {
            Granularity::Hourly => &self.hourly,
            Granularity::Daily => &self.daily,
            Granularity::Monthly => &self.monthly,
        }
    }
}

const TOTAL_CALLS: usize = 0;
const REFUGEE_CALLS: usize = 1;
const TOTAL_TRANSITIONS: usize = 2;
const REFUGEE_TRANSITIONS: usize = 3;

/// Accumulators for every bucket of one granularity.
struct GranularityAccumulator {
    granularity: Granularity,
    buckets: Vec<[RunningStats; 4]>,
}

impl GranularityAccumulator {
    fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            buckets: vec![[RunningStats::default(); 4]; granularity.bucket_count()],
        }
    }

    fn observe(&mut self, calls: &[u32], transitions: &[u32], refugee: bool) {
        for ((acc, &c), &t) in self.buckets.iter_mut().zip(calls).zip(transitions) {
            let (c, t) = (f64::from(c), f64::from(t));
            acc[TOTAL_CALLS].push(c);
            acc[TOTAL_TRANSITIONS].push(t);
            if refugee {
                acc[REFUGEE_CALLS].push(c);
                acc[REFUGEE_TRANSITIONS].push(t);
            }
        }
    }

    fn finish(&self) -> MetricStats {
        let column = |which: usize| {
            BucketStats::from_summaries(self.buckets.iter().map(|acc| acc[which].summary()))
        };
        MetricStats {
            calls: CohortSplit {
                total: column(TOTAL_CALLS),
                refugee: column(REFUGEE_CALLS),
            },
            transitions: CohortSplit {
                total: column(TOTAL_TRANSITIONS),
                refugee: column(REFUGEE_TRANSITIONS),
            },
        }
    }
}

/// Summarises call and transition histograms across `timelines`.
///
/// Every timeline must have had [`UserTimeline::count_transitions`] run;
/// aggregation must not start until ingestion is complete.
pub fn aggregate<'a, I>(timelines: I) -> Result<PopulationStats, AggregateError>
where
    I: IntoIterator<Item = &'a UserTimeline>,
{
    let mut accumulators = Granularity::ALL.map(GranularityAccumulator::new);
    let mut users = 0;
    let mut refugees = 0;

    for timeline in timelines {
        let transitions = timeline
            .transitions()
            .ok_or(AggregateError::TransitionsNotCounted {
                user: timeline.user(),
            })?;
        let refugee = timeline.cohort().is_refugee();
        users += 1;
        if refugee {
            refugees += 1;
        }
        for acc in &mut accumulators {
            acc.observe(
                timeline.calls().buckets(acc.granularity),
                transitions.buckets(acc.granularity),
                refugee,
            );
        }
    }

    let [monthly, daily, hourly] = accumulators.map(|acc| acc.finish());
    tracing::debug!(users, refugees, "aggregated population statistics");

    Ok(PopulationStats {
        users,
        refugees,
        hourly,
        daily,
        monthly,
    })
}

/// Sorts and counts transitions for every timeline, then aggregates.
///
/// Per-user preparation runs in parallel; the aggregation pass itself is a
/// single pass over the prepared population.
pub fn aggregate_population(
    population: &mut Population,
) -> Result<PopulationStats, AggregateError> {
    population.par_iter_mut().for_each(|(_, timeline)| {
        timeline.count_transitions();
    });
    aggregate(population.values())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventRecord;
    use crate::temporal::{
        DAYS_PER_YEAR, HOURS_PER_DAY, MONTHS_PER_YEAR, TemporalKey, TimeReference,
    };
    use crate::types::{Cohort, LocationId};

    fn timeline(user: u64, cohort: Cohort, calls: &[(i64, &str)]) -> UserTimeline {
        let reference = TimeReference::default();
        let mut timeline = UserTimeline::new(UserId::new(user), cohort);
        for &(location, raw) in calls {
            timeline.add_event(EventRecord::new(
                LocationId::new(location),
                TemporalKey::parse(raw, &reference),
            ));
        }
        timeline
    }

    fn population(timelines: Vec<UserTimeline>) -> Population {
        timelines.into_iter().map(|t| (t.user(), t)).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_two_users_hour_zero() {
        // Refugee: one call at hour 0. Non-refugee: three calls at hour 0.
        let mut pop = population(vec![
            timeline(1, Cohort::Refugee, &[(10, "05-01-2017 00:10")]),
            timeline(
                2,
                Cohort::NonRefugee,
                &[
                    (10, "05-01-2017 00:10"),
                    (10, "05-01-2017 00:20"),
                    (10, "05-01-2017 00:30"),
                ],
            ),
        ]);
        let stats = aggregate_population(&mut pop).unwrap();
        assert_eq!(stats.users, 2);
        assert_eq!(stats.refugees, 1);

        let total = stats.hourly.calls.total.get(0).unwrap();
        assert_close(total.mean, 2.0);
        assert_close(total.std, 1.0);
        assert_close(total.min, 1.0);
        assert_close(total.max, 3.0);

        let refugee = stats.hourly.calls.refugee.get(0).unwrap();
        assert_close(refugee.mean, 1.0);
        assert_close(refugee.std, 0.0);
        assert_close(refugee.min, 1.0);
        assert_close(refugee.max, 1.0);

        // Every other hour is zero for both users.
        let quiet = stats.hourly.calls.total.get(5).unwrap();
        assert_close(quiet.mean, 0.0);
        assert_close(quiet.max, 0.0);
    }

    #[test]
    fn test_non_refugee_only_subpopulation_bounds() {
        let mut pop = population(vec![timeline(
            2,
            Cohort::NonRefugee,
            &[
                (10, "05-01-2017 00:10"),
                (10, "05-01-2017 00:20"),
                (10, "05-01-2017 00:30"),
            ],
        )]);
        let stats = aggregate_population(&mut pop).unwrap();
        let total = stats.hourly.calls.total.get(0).unwrap();
        assert_close(total.min, 3.0);
        assert_close(total.max, 3.0);
    }

    #[test]
    fn test_empty_refugee_cohort_is_nan() {
        let mut pop = population(vec![timeline(
            7,
            Cohort::NonRefugee,
            &[(1, "05-01-2017 10:00"), (2, "05-01-2017 11:00")],
        )]);
        let stats = aggregate_population(&mut pop).unwrap();
        assert_eq!(stats.refugees, 0);

        for granularity in Granularity::ALL {
            let metric = stats.granularity(granularity);
            for split in [&metric.calls, &metric.transitions] {
                assert_eq!(split.refugee.len(), granularity.bucket_count());
                for bucket in 0..split.refugee.len() {
                    let s = split.refugee.get(bucket).unwrap();
                    assert!(s.mean.is_nan());
                    assert!(s.std.is_nan());
                    assert!(s.min.is_nan());
                    assert!(s.max.is_nan());
                }
                assert!(!split.total.get(0).unwrap().mean.is_nan());
            }
        }
    }

    #[test]
    fn test_empty_population_is_nan() {
        let stats = aggregate(std::iter::empty()).unwrap();
        assert_eq!(stats.users, 0);
        assert!(stats.monthly.calls.total.get(0).unwrap().mean.is_nan());
        assert_eq!(stats.monthly.calls.total.len(), MONTHS_PER_YEAR);
        assert_eq!(stats.daily.transitions.refugee.len(), DAYS_PER_YEAR);
        assert_eq!(stats.hourly.calls.refugee.len(), HOURS_PER_DAY);
    }

    #[test]
    fn test_transition_statistics() {
        // A A B A at hours 10..13 on Jan 2 -> transitions at 10, 12, 13.
        let mut pop = population(vec![
            timeline(
                1,
                Cohort::Refugee,
                &[
                    (1, "02-01-2017 10:00"),
                    (1, "02-01-2017 11:00"),
                    (2, "02-01-2017 12:00"),
                    (1, "02-01-2017 13:00"),
                ],
            ),
            timeline(2, Cohort::NonRefugee, &[(5, "02-01-2017 11:00")]),
        ]);
        let stats = aggregate_population(&mut pop).unwrap();

        let daily = stats.daily.transitions.total.get(1).unwrap();
        assert_close(daily.mean, 2.0);
        assert_close(daily.min, 1.0);
        assert_close(daily.max, 3.0);
        assert_close(stats.daily.transitions.refugee.get(1).unwrap().mean, 3.0);

        assert_close(stats.hourly.transitions.total.get(11).unwrap().mean, 0.5);
        assert_close(stats.monthly.calls.total.get(0).unwrap().mean, 2.5);
    }

    #[test]
    fn test_population_std_matches_two_pass() {
        let counts = [4_usize, 7, 1, 9, 3, 3];
        let mut timelines = Vec::new();
        for (i, &n) in counts.iter().enumerate() {
            let calls: Vec<(i64, &str)> = (0..n).map(|_| (1, "10-06-2017 15:30")).collect();
            timelines.push(timeline(i as u64 + 1, Cohort::Refugee, &calls));
        }
        let mut pop = population(timelines);
        let stats = aggregate_population(&mut pop).unwrap();

        let values: Vec<f64> = counts.iter().map(|&n| n as f64).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

        let s = stats.hourly.calls.total.get(15).unwrap();
        assert_close(s.mean, mean);
        assert_close(s.std, var.sqrt());
        assert_eq!(stats.hourly.calls.refugee.get(15), stats.hourly.calls.total.get(15));
    }

    #[test]
    fn test_uncounted_transitions_are_rejected() {
        let t = timeline(9, Cohort::Refugee, &[(1, "02-01-2017 10:00")]);
        let err = aggregate([&t]).unwrap_err();
        assert_eq!(
            err,
            AggregateError::TransitionsNotCounted {
                user: UserId::new(9)
            }
        );
    }

    #[test]
    fn test_serializes_nan_as_null() {
        let stats = aggregate(std::iter::empty()).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["hourly"]["calls"]["refugee"]["mean"][0].is_null());
        assert_eq!(json["users"], 0);
    }
}
