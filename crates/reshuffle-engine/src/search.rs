//! Greedy earliest-first slot search.
//!
//! For one destination day the search walks the window at a fixed step and
//! returns the first slot that survives every check. The winning slot is
//! claimed in the run's [`ReservationLedger`] in the same step that selects
//! it.

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use reshuffle_core::{ReservationLedger, Slot, TimeError, TimeWindow};
use reshuffle_providers::CalendarProvider;
use tracing::debug;

use crate::availability::{AvailabilityChecker, Verdict};
use crate::request::ScheduleSettings;
use crate::transcript::Transcript;

/// A destination day with its daily window and blackout, resolved to instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateWindow {
    pub date: NaiveDate,
    /// `[window_start, window_end)` on `date`.
    pub window: TimeWindow,
    /// Blackout sub-range on `date`. Empty when disabled.
    pub blackout: TimeWindow,
}

impl CandidateWindow {
    /// Resolves local wall-clock bounds on `date` in the calendar timezone.
    pub fn new(
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        settings: &ScheduleSettings,
        tz: &Tz,
    ) -> Result<Self, TimeError> {
        Ok(Self {
            date,
            window: TimeWindow::between_local(date, start, end, tz)?,
            blackout: TimeWindow::between_local(
                date,
                settings.blackout_start,
                settings.blackout_end,
                tz,
            )?,
        })
    }

    /// Grid-aligned candidate slots of `duration` that fit in the window.
    pub fn candidates(&self, duration: Duration, step: Duration) -> impl Iterator<Item = Slot> + '_ {
        let end = self.window.end;
        std::iter::successors(Some(self.window.start), move |t| Some(*t + step))
            .map(move |t| Slot::starting_at(t, duration))
            .take_while(move |slot| slot.end <= end)
    }
}

/// Scans candidate windows for a free slot.
pub struct SlotSearch<'a> {
    provider: &'a dyn CalendarProvider,
    calendar_id: &'a str,
    checker: AvailabilityChecker<'a>,
    step: Duration,
}

impl<'a> SlotSearch<'a> {
    pub fn new(
        provider: &'a dyn CalendarProvider,
        calendar_id: &'a str,
        tz: Tz,
        step: Duration,
    ) -> Self {
        Self {
            provider,
            calendar_id,
            checker: AvailabilityChecker::new(provider, tz),
            step,
        }
    }

    /// Returns the earliest free slot of `duration` in `window`, reserving it.
    ///
    /// Owner events are fetched once per call. If that fetch fails the window
    /// yields nothing. Slots whose availability cannot be determined are
    /// skipped.
    pub async fn find(
        &self,
        window: &CandidateWindow,
        duration: Duration,
        attendees: &[String],
        ledger: &mut ReservationLedger,
        transcript: &mut Transcript,
    ) -> Option<Slot> {
        if duration <= Duration::zero() || self.step <= Duration::zero() {
            return None;
        }

        transcript.debug(format!(
            "Searching for available slots on {} ({} minutes)",
            window.date,
            duration.num_minutes()
        ));

        let owner_events = match self.provider.list_events(self.calendar_id, window.window).await {
            Ok(events) => events,
            Err(e) => {
                transcript.warning(format!(
                    "An error occurred while searching for available slots on {}: {}",
                    window.date, e
                ));
                return None;
            }
        };
        debug!("found {} events in the time range", owner_events.len());

        for slot in window.candidates(duration, self.step) {
            if slot.overlaps_window(&window.blackout) {
                transcript.debug(format!("Skipping slot during blackout: {}", slot));
                continue;
            }
            if ledger.conflicts(&slot) {
                transcript.debug(format!("Skipping reserved slot: {}", slot));
                continue;
            }

            match self
                .checker
                .check(&slot, &window.blackout, &owner_events, attendees)
                .await
            {
                Verdict::Free => {
                    if ledger.try_reserve(slot) {
                        transcript.debug(format!("Available slot found: {}", slot.start));
                        return Some(slot);
                    }
                }
                Verdict::Unknown(reason) => {
                    transcript.warning(format!(
                        "Could not check availability for {}: {}",
                        slot, reason
                    ));
                }
                verdict => {
                    transcript.debug(format!("Slot {} blocked: {:?}", slot, verdict));
                }
            }
        }

        transcript.debug(format!("No available slot found on {}", window.date));
        None
    }
}
