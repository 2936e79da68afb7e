//! Event types for calendar events.
//!
//! This module provides core types for representing calendar events:
//! - [`CalendarEvent`]: A provider-agnostic event as read from a calendar
//! - [`Meeting`]: A timed, owner-organized event that can be relocated
//! - [`Transparency`]: Whether an event blocks time on its calendar
//! - [`EventCategory`]: The kind of calendar entry (regular meeting, focus time, ...)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{EventTime, Slot};

/// Whether an event blocks time on the calendar it lives on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transparency {
    /// The event blocks time (shown as busy).
    #[default]
    Opaque,
    /// The event does not block time (shown as free).
    Transparent,
}

impl Transparency {
    /// Parses a provider transparency value; anything but `transparent` is busy.
    pub fn from_provider_str(value: &str) -> Self {
        if value.eq_ignore_ascii_case("transparent") {
            Self::Transparent
        } else {
            Self::Opaque
        }
    }

    /// Returns true if the event should count as a conflict.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Opaque)
    }
}

/// The kind of calendar entry.
///
/// Only [`EventCategory::Default`] entries are real bookings; the others are
/// cosmetic markers (out of office, focus time, working location, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// A regular event.
    #[default]
    Default,
    OutOfOffice,
    FocusTime,
    WorkingLocation,
    Birthday,
    FromGmail,
    /// Any type the provider reports that we do not know about.
    Other(String),
}

impl EventCategory {
    /// Maps a provider event type string (e.g. Google's `eventType`).
    pub fn from_provider_str(value: &str) -> Self {
        match value {
            "default" => Self::Default,
            "outOfOffice" => Self::OutOfOffice,
            "focusTime" => Self::FocusTime,
            "workingLocation" => Self::WorkingLocation,
            "birthday" => Self::Birthday,
            "fromGmail" => Self::FromGmail,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the provider string for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::OutOfOffice => "outOfOffice",
            Self::FocusTime => "focusTime",
            Self::WorkingLocation => "workingLocation",
            Self::Birthday => "birthday",
            Self::FromGmail => "fromGmail",
            Self::Other(other) => other,
        }
    }

    /// Returns true for regular bookings.
    pub fn is_standard(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// A calendar event from any provider.
///
/// This is the canonical representation of an event after fetching from a
/// calendar provider. It carries everything slot search and meeting
/// selection need, and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Unique identifier for the event (provider-specific).
    pub id: String,
    /// The event title/summary.
    pub title: String,
    /// Email of the organizer, if the provider reports one.
    pub organizer: Option<String>,
    /// Attendee emails in provider order.
    pub attendees: Vec<String>,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Whether the event blocks time.
    pub transparency: Transparency,
    /// The kind of calendar entry.
    pub category: EventCategory,
    /// The calendar this event belongs to.
    pub calendar_id: String,
}

impl CalendarEvent {
    /// Creates a new event with required fields.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: EventTime,
        end: EventTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            organizer: None,
            attendees: Vec::new(),
            start,
            end,
            transparency: Transparency::Opaque,
            category: EventCategory::Default,
            calendar_id: calendar_id.into(),
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day() || self.end.is_all_day()
    }

    /// Returns true if the organizer matches the given identity.
    pub fn is_organized_by(&self, identity: &str) -> bool {
        self.organizer
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case(identity))
    }

    /// Builder method to set the organizer.
    pub fn with_organizer(mut self, organizer: impl Into<String>) -> Self {
        self.organizer = Some(organizer.into());
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, email: impl Into<String>) -> Self {
        self.attendees.push(email.into());
        self
    }

    /// Builder method to set attendees.
    pub fn with_attendees(mut self, attendees: Vec<String>) -> Self {
        self.attendees = attendees;
        self
    }

    /// Builder method to set transparency.
    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    /// Builder method to set the category.
    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = category;
        self
    }
}

/// A timed meeting that is a candidate for relocation.
///
/// Built from a [`CalendarEvent`] that has concrete start and end instants
/// and a positive duration. Immutable during slot search; relocation yields
/// a new [`Slot`] of the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub organizer: String,
    /// Attendee emails, deduplicated, in provider order.
    pub attendees: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub transparency: Transparency,
}

impl Meeting {
    /// Builds a meeting from an event.
    ///
    /// Returns `None` for all-day events, events without an organizer, and
    /// events whose end is not after their start.
    pub fn from_event(event: &CalendarEvent) -> Option<Self> {
        let start = event.start.as_datetime()?;
        let end = event.end.as_datetime()?;
        if end <= start {
            return None;
        }
        let organizer = event.organizer.clone()?;

        let mut attendees: Vec<String> = Vec::with_capacity(event.attendees.len());
        for email in &event.attendees {
            if !attendees.iter().any(|a| a.eq_ignore_ascii_case(email)) {
                attendees.push(email.clone());
            }
        }

        Some(Self {
            id: event.id.clone(),
            title: event.title.clone(),
            organizer,
            attendees,
            start,
            end,
            transparency: event.transparency,
        })
    }

    /// Returns the meeting length.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns the meeting's current slot.
    pub fn slot(&self) -> Slot {
        Slot::new(self.start, self.end)
    }

    /// Returns the slot this meeting would occupy if it started at `start`.
    pub fn relocated_to(&self, start: DateTime<Utc>) -> Slot {
        Slot::starting_at(start, self.duration())
    }
}
