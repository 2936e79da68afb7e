//! Run inputs and their validation.
//!
//! A [`RescheduleRequest`] carries the raw strings a user typed. Parsing
//! happens up front so that malformed input aborts the run before any
//! provider call is made.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Slot grid and blackout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Grid step between candidate slot starts, in minutes.
    pub step_minutes: u32,
    /// Daily blackout start (local wall-clock time).
    pub blackout_start: NaiveTime,
    /// Daily blackout end (local wall-clock time).
    pub blackout_end: NaiveTime,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            step_minutes: 15,
            blackout_start: NaiveTime::MIN + Duration::hours(12),
            blackout_end: NaiveTime::MIN + Duration::hours(13),
        }
    }
}

impl ScheduleSettings {
    pub fn with_step_minutes(mut self, minutes: u32) -> Self {
        self.step_minutes = minutes;
        self
    }

    pub fn with_blackout(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.blackout_start = start;
        self.blackout_end = end;
        self
    }

    /// Grid step as a duration.
    pub fn step(&self) -> Duration {
        Duration::minutes(i64::from(self.step_minutes))
    }

    /// Checks the step is positive and the blackout is not inverted.
    ///
    /// A blackout whose start equals its end disables the blackout.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.step_minutes == 0 {
            return Err(RequestError::Settings("step must be positive".to_string()));
        }
        if self.blackout_start > self.blackout_end {
            return Err(RequestError::Settings(format!(
                "blackout start {} is after blackout end {}",
                self.blackout_start.format("%H:%M"),
                self.blackout_end.format("%H:%M")
            )));
        }
        Ok(())
    }
}

/// Raw inputs for one rescheduling run.
#[derive(Debug, Clone)]
pub struct RescheduleRequest {
    /// Comma-separated `YYYY-MM-DD` dates whose meetings must move.
    pub blocked_dates: String,
    /// Comma-separated `YYYY-MM-DD` destination dates, in preference order.
    pub candidate_dates: String,
    /// Daily window start, `HH:MM`.
    pub window_start: String,
    /// Daily window end, `HH:MM`.
    pub window_end: String,
    /// Compute the plan without writing to the calendar.
    pub dry_run: bool,
    /// Keep debug lines in the transcript.
    pub verbose: bool,
    /// Calendar to read and write.
    pub calendar_id: String,
    /// Owner identity; looked up from the calendar when unset.
    pub organizer: Option<String>,
    pub settings: ScheduleSettings,
}

impl RescheduleRequest {
    /// Creates a request. Dry run is on unless turned off explicitly.
    pub fn new(
        blocked_dates: impl Into<String>,
        candidate_dates: impl Into<String>,
        window_start: impl Into<String>,
        window_end: impl Into<String>,
    ) -> Self {
        Self {
            blocked_dates: blocked_dates.into(),
            candidate_dates: candidate_dates.into(),
            window_start: window_start.into(),
            window_end: window_end.into(),
            dry_run: true,
            verbose: false,
            calendar_id: "primary".to_string(),
            organizer: None,
            settings: ScheduleSettings::default(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn with_organizer(mut self, organizer: impl Into<String>) -> Self {
        self.organizer = Some(organizer.into());
        self
    }

    pub fn with_settings(mut self, settings: ScheduleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Parses and validates every input field.
    pub fn parse(&self) -> Result<ParsedRequest, RequestError> {
        let blocked_days = parse_dates(&self.blocked_dates).ok_or_else(|| {
            RequestError::BlockedDates {
                input: self.blocked_dates.clone(),
            }
        })?;
        let candidate_days = parse_dates(&self.candidate_dates).ok_or_else(|| {
            RequestError::CandidateDates {
                input: self.candidate_dates.clone(),
            }
        })?;
        let window_start = parse_time(&self.window_start)?;
        let window_end = parse_time(&self.window_end)?;
        if window_start >= window_end {
            return Err(RequestError::EmptyWindow {
                start: self.window_start.trim().to_string(),
                end: self.window_end.trim().to_string(),
            });
        }
        self.settings.validate()?;

        Ok(ParsedRequest {
            blocked_days,
            candidate_days,
            window_start,
            window_end,
        })
    }
}

/// Validated run inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Processed in order; earlier days get first claim on slots.
    pub blocked_days: Vec<NaiveDate>,
    /// Tried in order for every meeting.
    pub candidate_days: Vec<NaiveDate>,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

fn parse_dates(input: &str) -> Option<Vec<NaiveDate>> {
    input
        .split(',')
        .map(|part| NaiveDate::parse_from_str(part.trim(), "%Y-%m-%d").ok())
        .collect()
}

/// Parses `HH:MM` (24-hour clock).
pub fn parse_time(input: &str) -> Result<NaiveTime, RequestError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| RequestError::TimeOfDay {
        input: input.to_string(),
    })
}
