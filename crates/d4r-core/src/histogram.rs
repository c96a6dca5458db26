//! Fixed-size per-user histograms over calendar buckets.

use crate::temporal::{CallTime, DAYS_PER_YEAR, Granularity, HOURS_PER_DAY, MONTHS_PER_YEAR};

/// Counts per slot for a fixed number of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram<const N: usize>([u32; N]);

impl<const N: usize> Histogram<N> {
    pub const fn new() -> Self {
        Self([0; N])
    }

    /// Adds one to `slot`. Out-of-range slots are ignored.
    pub fn increment(&mut self, slot: usize) {
        if let Some(count) = self.0.get_mut(slot) {
            *count = count.saturating_add(1);
        }
    }

    pub fn get(&self, slot: usize) -> Option<u32> {
        self.0.get(slot).copied()
    }

    pub const fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| u64::from(c)).sum()
    }
}

impl<const N: usize> Default for Histogram<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hour-of-day, day-of-year and month-of-year histograms kept together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarHistograms {
    hourly: Histogram<HOURS_PER_DAY>,
    daily: Histogram<DAYS_PER_YEAR>,
    monthly: Histogram<MONTHS_PER_YEAR>,
}

impl CalendarHistograms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts `time` once in each granularity it maps into.
    pub fn record(&mut self, time: &CallTime) {
        if let Some(slot) = Granularity::Hourly.slot(time) {
            self.hourly.increment(slot);
        }
        if let Some(slot) = Granularity::Daily.slot(time) {
            self.daily.increment(slot);
        }
        if let Some(slot) = Granularity::Monthly.slot(time) {
            self.monthly.increment(slot);
        }
    }

    pub const fn hourly(&self) -> &Histogram<HOURS_PER_DAY> {
        &self.hourly
    }

    pub const fn daily(&self) -> &Histogram<DAYS_PER_YEAR> {
        &self.daily
    }

    pub const fn monthly(&self) -> &Histogram<MONTHS_PER_YEAR> {
        &self.monthly
    }

    /// Bucket counts at the given resolution.
    pub const fn buckets(&self, granularity: Granularity) -> &[u32] {
        match granularity {
            Granularity::Hourly => self.hourly.as_slice(),
            Granularity::Daily => self.daily.as_slice(),
            Granularity::Monthly => self.monthly.as_slice(),
        }
    }
}
