//! Time types for calendar events and slot search.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific datetime or an all-day date), [`TimeWindow`]
//! for query ranges, [`Slot`] for concrete start/end pairs, and helpers to
//! turn a local date and wall-clock time into an instant in a calendar's
//! timezone.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while interpreting dates, times and timezones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The timezone identifier is not a known IANA zone.
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),

    /// The local wall-clock time does not exist on that date (DST gap).
    #[error("local time {time} does not exist on {date} in {timezone}")]
    NonexistentLocalTime {
        date: NaiveDate,
        time: NaiveTime,
        timezone: String,
    },
}

/// Parses an IANA timezone identifier such as `Europe/Paris`.
pub fn parse_timezone(name: &str) -> Result<Tz, TimeError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimeError::InvalidTimezone(name.to_string()))
}

/// Resolves a local date and wall-clock time to a UTC instant.
///
/// Ambiguous times (DST fall-back) resolve to the earliest occurrence.
pub fn local_instant(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, TimeError> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeError::NonexistentLocalTime {
            date,
            time,
            timezone: tz.name().to_string(),
        })
}

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (with timezone, stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Z: TimeZone>(dt: DateTime<Z>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::AllDay(_) => None,
        }
    }

    /// Converts to a UTC datetime for ordering purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Resolves this time to an instant in the given calendar timezone.
    ///
    /// All-day dates start at local midnight, which is how a calendar lays
    /// them out for its owner.
    pub fn resolve(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => local_instant(tz, *date, NaiveTime::MIN)
                .unwrap_or_else(|_| self.to_utc_datetime()),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a window covering one local calendar day in the given timezone.
    pub fn for_date(date: NaiveDate, tz: &Tz) -> Result<Self, TimeError> {
        let start = local_instant(tz, date, NaiveTime::MIN)?;
        let next = date.succ_opt().unwrap_or(date);
        let end = local_instant(tz, next, NaiveTime::MIN)?;
        Ok(Self { start, end })
    }

    /// Creates a window spanning two wall-clock times on a local date.
    pub fn between_local(
        date: NaiveDate,
        from: NaiveTime,
        to: NaiveTime,
        tz: &Tz,
    ) -> Result<Self, TimeError> {
        let start = local_instant(tz, date, from)?;
        let end = local_instant(tz, date, to)?;
        Ok(Self {
            start,
            end: end.max(start),
        })
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if the half-open range `[start, end)` overlaps this window.
    ///
    /// Touching ranges (one ends exactly where the other starts) do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    /// Checks if the range `[start, end)` lies entirely inside this window.
    pub fn encloses(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= start && end <= self.end
    }
}

/// A concrete start/end pair being evaluated or assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    /// Start of the slot (inclusive).
    pub start: DateTime<Utc>,
    /// End of the slot (exclusive).
    pub end: DateTime<Utc>,
}

impl Slot {
    /// Creates a slot from explicit bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Creates a slot of the given length beginning at `start`.
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    /// Returns the slot length.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test against another range.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Half-open overlap test against a window.
    pub fn overlaps_window(&self, window: &TimeWindow) -> bool {
        window.overlaps(self.start, self.end)
    }

    /// Renders the slot in the given timezone, e.g. `2025-03-04 13:00-13:30 (Europe/Paris)`.
    pub fn display_in(&self, tz: &Tz) -> String {
        let start = self.start.with_timezone(tz);
        let end = self.end.with_timezone(tz);
        if start.date_naive() == end.date_naive() {
            format!(
                "{} {}-{} ({})",
                start.format("%Y-%m-%d"),
                start.format("%H:%M"),
                end.format("%H:%M"),
                tz.name()
            )
        } else {
            format!(
                "{} - {} ({})",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M"),
                tz.name()
            )
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
