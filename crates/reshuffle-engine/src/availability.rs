//! Slot availability checks.
//!
//! A slot is blocked by the daily blackout, by a busy event on the owner's
//! own calendar, or by any attendee reported busy through free/busy. The
//! local checks run first; free/busy is only queried once they pass.

use chrono_tz::Tz;
use reshuffle_core::{CalendarEvent, Slot, TimeWindow};
use reshuffle_providers::CalendarProvider;
use tracing::{debug, warn};

/// Result of checking one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Free,
    /// Overlaps the daily blackout.
    Blackout,
    /// Overlaps a busy owner event with this title.
    OwnerBusy(String),
    /// These attendees are busy.
    AttendeesBusy(Vec<String>),
    /// Availability could not be determined; treated as blocked.
    Unknown(String),
}

impl Verdict {
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }
}

/// Checks candidate slots against local events and attendee free/busy.
pub struct AvailabilityChecker<'a> {
    provider: &'a dyn CalendarProvider,
    tz: Tz,
}

impl<'a> AvailabilityChecker<'a> {
    pub fn new(provider: &'a dyn CalendarProvider, tz: Tz) -> Self {
        Self { provider, tz }
    }

    /// Blackout and owner-calendar checks. No I/O.
    ///
    /// Transparent events never conflict. All-day events span their local
    /// days in the calendar timezone.
    pub fn local_conflict(
        &self,
        slot: &Slot,
        blackout: &TimeWindow,
        owner_events: &[CalendarEvent],
    ) -> Option<Verdict> {
        if slot.overlaps_window(blackout) {
            return Some(Verdict::Blackout);
        }

        owner_events
            .iter()
            .filter(|event| event.transparency.is_busy())
            .find(|event| slot.overlaps(event.start.resolve(&self.tz), event.end.resolve(&self.tz)))
            .map(|event| Verdict::OwnerBusy(event.title.clone()))
    }

    /// Full check for one slot.
    ///
    /// Attendees missing from the free/busy answer count as free. A failed
    /// free/busy query yields [`Verdict::Unknown`].
    pub async fn check(
        &self,
        slot: &Slot,
        blackout: &TimeWindow,
        owner_events: &[CalendarEvent],
        attendees: &[String],
    ) -> Verdict {
        if let Some(conflict) = self.local_conflict(slot, blackout, owner_events) {
            return conflict;
        }
        if attendees.is_empty() {
            return Verdict::Free;
        }

        let window = TimeWindow::new(slot.start, slot.end);
        match self.provider.query_free_busy(attendees, window).await {
            Ok(free_busy) if free_busy.any_busy() => {
                let busy = free_busy
                    .busy_emails()
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                debug!("conflict found for attendees: {}", busy.join(", "));
                Verdict::AttendeesBusy(busy)
            }
            Ok(_) => Verdict::Free,
            Err(e) => {
                warn!("free/busy lookup failed for {}: {}", slot, e);
                Verdict::Unknown(e.to_string())
            }
        }
    }
}
