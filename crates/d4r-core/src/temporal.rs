//! Call timestamps and their calendar bucket mapping.
//!
//! A [`TemporalKey`] is either a parsed, calendar-decomposed call time or the
//! `Invalid` marker. Keys order chronologically, and every valid key sorts
//! before every invalid one.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Number of slots in the hour-of-day histogram.
pub const HOURS_PER_DAY: usize = 24;

/// Number of slots in the day-of-year histogram.
pub const DAYS_PER_YEAR: usize = 365;

/// Number of slots in the month-of-year histogram.
pub const MONTHS_PER_YEAR: usize = 12;

/// Layout of call timestamps in the raw records, e.g. `17-03-2017 08:05`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

const SECONDS_PER_DAY: i64 = 86_400;

/// Timestamp layout plus the origin that day indices are measured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeReference {
    format: String,
    origin: NaiveDateTime,
}

impl TimeReference {
    pub fn new(format: impl Into<String>, origin: NaiveDateTime) -> Self {
        Self {
            format: format.into(),
            origin,
        }
    }

    /// Builds a reference whose origin is itself written in `format`.
    pub fn parse(format: impl Into<String>, origin: &str) -> Result<Self, chrono::ParseError> {
        let format = format.into();
        let origin = NaiveDateTime::parse_from_str(origin, &format)?;
        Ok(Self { format, origin })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub const fn origin(&self) -> NaiveDateTime {
        self.origin
    }
}

impl Default for TimeReference {
    /// Start of 2017, the year the call records cover.
    fn default() -> Self {
        let origin = NaiveDate::from_ymd_opt(2017, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self::new(DEFAULT_TIMESTAMP_FORMAT, origin)
    }
}

/// A successfully parsed call time.
///
/// Field order matters: the derived ordering compares year, month, day, hour
/// and minute lexicographically. `day_index` is a function of the others and
/// never changes the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallTime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    day_index: u32,
}

impl CallTime {
    /// Decomposes `time` and measures its whole-day distance from `origin`.
    ///
    /// The distance is floored before taking the absolute value, so a call
    /// half a day before the origin is one day away.
    pub fn from_datetime(time: NaiveDateTime, origin: NaiveDateTime) -> Self {
        let days = (time - origin)
            .num_seconds()
            .div_euclid(SECONDS_PER_DAY)
            .unsigned_abs();
        Self {
            year: time.year(),
            month: time.month(),
            day: time.day(),
            hour: time.hour(),
            minute: time.minute(),
            day_index: u32::try_from(days).unwrap_or(u32::MAX),
        }
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1-based.
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Day of month, 1-based.
    pub const fn day(&self) -> u32 {
        self.day
    }

    pub const fn hour(&self) -> u32 {
        self.hour
    }

    pub const fn minute(&self) -> u32 {
        self.minute
    }

    /// Absolute number of days from the reference origin.
    pub const fn day_index(&self) -> u32 {
        self.day_index
    }
}

impl fmt::Display for CallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

/// A call timestamp that may have failed to parse.
///
/// `Valid` is declared first so the derived ordering puts every valid key
/// before `Invalid`, and two `Invalid` keys compare equal (a stable sort
/// leaves them in arrival order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemporalKey {
    Valid(CallTime),
    Invalid,
}

impl TemporalKey {
    /// Parses `raw` with the reference layout. Never fails: unparseable
    /// input becomes [`TemporalKey::Invalid`].
    pub fn parse(raw: &str, reference: &TimeReference) -> Self {
        match NaiveDateTime::parse_from_str(raw, reference.format()) {
            Ok(time) => Self::Valid(CallTime::from_datetime(time, reference.origin())),
            Err(e) => {
                tracing::trace!(raw, error = %e, "unparseable timestamp");
                Self::Invalid
            }
        }
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub const fn call_time(&self) -> Option<&CallTime> {
        match self {
            Self::Valid(time) => Some(time),
            Self::Invalid => None,
        }
    }
}

impl fmt::Display for TemporalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(time) => write!(f, "{time}"),
            Self::Invalid => f.write_str("XXXX-XX-XX XX:XX"),
        }
    }
}

/// Histogram resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
}

impl Granularity {
    /// All granularities, in the order reports list them.
    pub const ALL: [Self; 3] = [Self::Monthly, Self::Daily, Self::Hourly];

    pub const fn bucket_count(self) -> usize {
        match self {
            Self::Hourly => HOURS_PER_DAY,
            Self::Daily => DAYS_PER_YEAR,
            Self::Monthly => MONTHS_PER_YEAR,
        }
    }

    /// Histogram slot for `time`, or `None` if it falls outside the range.
    pub fn slot(self, time: &CallTime) -> Option<usize> {
        match self {
            Self::Hourly => hour_slot(time.hour()),
            Self::Daily => day_slot(time.day_index()),
            Self::Monthly => month_slot(time.month()),
        }
    }
}

/// Maps an hour of day to its slot. chrono hours are already 0-based, so the
/// slot is the hour itself.
pub fn hour_slot(hour: u32) -> Option<usize> {
    usize::try_from(hour).ok().filter(|&h| h < HOURS_PER_DAY)
}

/// Maps a 1-based calendar month to its 0-based slot.
pub fn month_slot(month: u32) -> Option<usize> {
    let slot = usize::try_from(month.checked_sub(1)?).ok()?;
    (slot < MONTHS_PER_YEAR).then_some(slot)
}

/// Maps a day index to its slot in the 365-day yearly histogram.
pub fn day_slot(day_index: u32) -> Option<usize> {
    usize::try_from(day_index).ok().filter(|&d| d < DAYS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> TemporalKey {
        TemporalKey::parse(raw, &TimeReference::default())
    }

    #[test]
    fn test_parse_valid_timestamp() {
        let parsed = key("17-03-2017 08:05");
        let time = parsed.call_time().unwrap();
        assert_eq!(time.year(), 2017);
        assert_eq!(time.month(), 3);
        assert_eq!(time.day(), 17);
        assert_eq!(time.hour(), 8);
        assert_eq!(time.minute(), 5);
        // Jan (31) + Feb (28) + 16 days into March
        assert_eq!(time.day_index(), 75);
    }

    #[test]
    fn test_parse_rejects_other_layouts() {
        assert_eq!(key("2017-03-17 08:05"), TemporalKey::Invalid);
        assert_eq!(key("17-03-2017"), TemporalKey::Invalid);
        assert_eq!(key("31-02-2017 10:00"), TemporalKey::Invalid);
        assert_eq!(key(""), TemporalKey::Invalid);
        assert!(!key("garbage").is_valid());
    }

    #[test]
    fn test_origin_is_day_zero() {
        assert_eq!(key("01-01-2017 00:00").call_time().unwrap().day_index(), 0);
        assert_eq!(key("01-01-2017 23:59").call_time().unwrap().day_index(), 0);
        assert_eq!(key("31-12-2017 12:00").call_time().unwrap().day_index(), 364);
        assert_eq!(key("01-01-2018 00:00").call_time().unwrap().day_index(), 365);
    }

    #[test]
    fn test_day_index_before_origin_is_floored_then_absolute() {
        // Half a day before the origin floors to -1 day.
        assert_eq!(key("31-12-2016 12:00").call_time().unwrap().day_index(), 1);
        assert_eq!(key("30-12-2016 00:00").call_time().unwrap().day_index(), 2);
    }

    #[test]
    fn test_ordering_is_chronological() {
        let earlier = key("17-03-2017 08:05");
        let later_minute = key("17-03-2017 08:06");
        let later_year = key("01-01-2018 00:00");
        assert!(earlier < later_minute);
        assert!(later_minute < later_year);
        assert!(key("31-12-2016 23:59") < earlier);
    }

    #[test]
    fn test_valid_sorts_before_invalid() {
        let valid = key("31-12-2030 23:59");
        assert!(valid < TemporalKey::Invalid);
        assert!(TemporalKey::Invalid > valid);
    }

    #[test]
    fn test_invalid_keys_are_not_earlier_than_each_other() {
        let a = TemporalKey::Invalid;
        let b = key("nonsense");
        assert!(!(a < b));
        assert!(!(b < a));
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(key("07-11-2017 09:03").to_string(), "2017-11-07 09:03");
        assert_eq!(TemporalKey::Invalid.to_string(), "XXXX-XX-XX XX:XX");
    }

    #[test]
    fn test_hour_slot_is_zero_based() {
        assert_eq!(hour_slot(0), Some(0));
        assert_eq!(hour_slot(23), Some(23));
        assert_eq!(hour_slot(24), None);
    }

    #[test]
    fn test_month_slot_shifts_calendar_month() {
        assert_eq!(month_slot(1), Some(0));
        assert_eq!(month_slot(12), Some(11));
        assert_eq!(month_slot(0), None);
        assert_eq!(month_slot(13), None);
    }

    #[test]
    fn test_day_slot_bounds() {
        assert_eq!(day_slot(0), Some(0));
        assert_eq!(day_slot(364), Some(364));
        assert_eq!(day_slot(365), None);
    }

    #[test]
    fn test_granularity_slot() {
        let parsed = key("17-03-2017 00:30");
        let time = parsed.call_time().unwrap();
        assert_eq!(Granularity::Hourly.slot(time), Some(0));
        assert_eq!(Granularity::Monthly.slot(time), Some(2));
        assert_eq!(Granularity::Daily.slot(time), Some(75));
        assert_eq!(Granularity::Daily.bucket_count(), 365);
    }

    #[test]
    fn test_custom_reference() {
        let reference = TimeReference::parse("%Y/%m/%d %H:%M", "2018/01/01 00:00").unwrap();
        let parsed = TemporalKey::parse("2018/02/01 10:00", &reference);
        assert_eq!(parsed.call_time().unwrap().day_index(), 31);
        assert!(TimeReference::parse("%Y/%m/%d %H:%M", "01-01-2018 00:00").is_err());
    }
}
