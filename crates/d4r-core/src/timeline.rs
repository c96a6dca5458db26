//! Per-user call history and the values derived from it.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::event::EventRecord;
use crate::histogram::CalendarHistograms;
use crate::markov::{MarkovTable, build_markov_table};
use crate::transitions::count_transitions;
use crate::types::{Cohort, UserId};

/// Every caller's timeline, keyed and ordered by user id.
pub type Population = BTreeMap<UserId, UserTimeline>;

/// All calls of one user, in arrival order until sorted.
///
/// Derived values follow an explicit lifecycle:
///
/// - `ensure_sorted` sorts once; later calls are no-ops.
/// - `count_transitions` fills the transition histograms once; later calls
///   are no-ops returning `false`.
/// - `build_markov` builds the transition table once and caches it.
///
/// Appending a call after any of these resets them, so the next call
/// recomputes from the full sequence.
#[derive(Debug, Clone)]
pub struct UserTimeline {
    user: UserId,
    cohort: Cohort,
    events: Vec<EventRecord>,
    sorted: bool,
    call_count: usize,
    invalid_format_count: usize,
    calls: CalendarHistograms,
    transitions: Option<CalendarHistograms>,
    markov: Option<MarkovTable>,
}

impl UserTimeline {
    pub fn new(user: UserId, cohort: Cohort) -> Self {
        Self {
            user,
            cohort,
            events: Vec::new(),
            sorted: true,
            call_count: 0,
            invalid_format_count: 0,
            calls: CalendarHistograms::new(),
            transitions: None,
            markov: None,
        }
    }

    /// Appends a call and counts it in the call histograms.
    ///
    /// A call with an invalid timestamp only bumps the invalid-format count.
    pub fn add_event(&mut self, event: EventRecord) {
        self.call_count += 1;
        match event.time().call_time() {
            Some(time) => self.calls.record(time),
            None => self.invalid_format_count += 1,
        }
        self.events.push(event);

        self.sorted = self.events.len() <= 1;
        self.transitions = None;
        self.markov = None;
    }

    /// Sorts calls chronologically. Returns `true` if a sort was performed.
    ///
    /// The sort is stable: calls with equal or invalid timestamps keep their
    /// arrival order.
    pub fn ensure_sorted(&mut self) -> bool {
        if self.sorted {
            return false;
        }
        self.events.sort_by(|a, b| a.time().cmp(b.time()));
        self.sorted = true;
        true
    }

    /// Counts location transitions into hourly, daily and monthly histograms.
    ///
    /// Sorts first if needed. Returns `false` without recounting if the
    /// transitions are already counted.
    pub fn count_transitions(&mut self) -> bool {
        if self.transitions.is_some() {
            return false;
        }
        self.ensure_sorted();
        self.transitions = Some(count_transitions(&self.events));
        true
    }

    /// Builds (or returns the cached) Markov transition table.
    pub fn build_markov(&mut self) -> &MarkovTable {
        self.ensure_sorted();
        self.markov
            .get_or_insert_with(|| build_markov_table(&self.events))
    }

    pub const fn user(&self) -> UserId {
        self.user
    }

    pub const fn cohort(&self) -> Cohort {
        self.cohort
    }

    /// Calls in their current order.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub const fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Total calls, including those with an invalid timestamp.
    pub const fn call_count(&self) -> usize {
        self.call_count
    }

    pub const fn invalid_format_count(&self) -> usize {
        self.invalid_format_count
    }

    /// Call counts per calendar bucket.
    pub const fn calls(&self) -> &CalendarHistograms {
        &self.calls
    }

    /// Transition counts per calendar bucket, once counted.
    pub const fn transitions(&self) -> Option<&CalendarHistograms> {
        self.transitions.as_ref()
    }

    /// The Markov table, once built.
    pub const fn markov(&self) -> Option<&MarkovTable> {
        self.markov.as_ref()
    }
}

/// Builds every user's Markov table, in parallel across users.
pub fn build_markov_tables(population: &mut Population) {
    population.par_iter_mut().for_each(|(_, timeline)| {
        timeline.build_markov();
    });
    tracing::debug!(users = population.len(), "built markov tables");
}
