//! Meeting selection for a blocked day.
//!
//! Filters a day's events down to real bookings organized by the calendar
//! owner that start on that day. Cosmetic entries (out of office, focus time, working location,
//! birthdays, all-day markers) are never moved.

use tracing::debug;

use crate::event::{CalendarEvent, Meeting};
use crate::time::TimeWindow;

/// Selects the meetings the owner organizes from a day's events.
///
/// Rules, in order:
/// 1. drop anything that is not a standard timed event;
/// 2. keep only events organized by `organizer`;
/// 3. keep only meetings starting inside `day`.
///
/// A meeting that crosses midnight therefore belongs to the day it starts
/// on, even though listing the next day also returns it.
///
/// Output keeps the input (chronological) order.
pub fn select_meetings(events: &[CalendarEvent], organizer: &str, day: &TimeWindow) -> Vec<Meeting> {
    events
        .iter()
        .filter(|event| {
            if !event.category.is_standard() || event.is_all_day() {
                debug!(
                    "skipping non-default event '{}' ({})",
                    event.title,
                    event.category.as_str()
                );
                return false;
            }
            event.is_organized_by(organizer)
        })
        .filter_map(|event| {
            let meeting = Meeting::from_event(event)?;
            if !day.contains(meeting.start) {
                debug!("event '{}' starts on another day", event.title);
                return None;
            }
            debug!("event '{}' added to reschedule list", event.title);
            Some(meeting)
        })
        .collect()
}
