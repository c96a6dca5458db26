//! Location-change counting over a chronologically sorted call sequence.
//!
//! A transition is credited to every call whose location differs from the
//! call immediately before it. The first call always counts, because there
//! is no previous location to match. Repeated calls from one location add
//! nothing.

use crate::event::EventRecord;
use crate::histogram::CalendarHistograms;

/// Counts transitions into hourly, daily and monthly histograms, bucketed at
/// the arriving call's time.
///
/// `events` must already be sorted. Calls with an invalid timestamp still
/// update the previous location but are not bucketed.
pub fn count_transitions(events: &[EventRecord]) -> CalendarHistograms {
    let mut histograms = CalendarHistograms::new();
    let mut previous = None;

    for event in events {
        let location = event.location();
        if previous != Some(location) {
            if let Some(time) = event.time().call_time() {
                histograms.record(time);
            }
        }
        previous = Some(location);
    }

    histograms
}
