//! Validated call events.

use crate::temporal::TemporalKey;
use crate::types::LocationId;

/// One call: where the caller was and when.
///
/// The caller is implied by the [`UserTimeline`](crate::UserTimeline) that
/// owns the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    location: LocationId,
    time: TemporalKey,
}

impl EventRecord {
    pub const fn new(location: LocationId, time: TemporalKey) -> Self {
        Self { location, time }
    }

    pub const fn location(&self) -> LocationId {
        self.location
    }

    pub const fn time(&self) -> &TemporalKey {
        &self.time
    }
}
