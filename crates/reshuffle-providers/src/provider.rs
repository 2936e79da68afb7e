//! CalendarProvider trait definition.
//!
//! The [`CalendarProvider`] trait is the only point of contact between the
//! rescheduling engine and the outside world. It covers four operations:
//!
//! - reading calendar metadata (owner identity, timezone)
//! - listing events in a time range
//! - querying attendee free/busy for a time range
//! - moving an event to a new start/end
//!
//! Authentication, token lifecycle and transport stay behind the trait.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use reshuffle_core::{CalendarEvent, Slot, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// Information about a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInfo {
    /// Calendar identifier. For a user's primary calendar this is the
    /// owner's email address.
    pub id: String,
    /// Human-readable name of the calendar.
    #[serde(default)]
    pub name: String,
    /// The timezone of the calendar (IANA identifier).
    #[serde(default)]
    pub timezone: Option<String>,
}

impl CalendarInfo {
    /// Creates a new CalendarInfo with the given ID and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timezone: None,
        }
    }

    /// Builder method to set timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Returns the calendar timezone, falling back to `UTC` when unset.
    pub fn timezone_or_utc(&self) -> &str {
        self.timezone.as_deref().unwrap_or("UTC")
    }
}

/// Result of a free/busy query: whether each queried email is busy.
///
/// Emails the provider could not answer for are absent and count as free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeBusy {
    busy: BTreeMap<String, bool>,
}

impl FreeBusy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the state of one email.
    pub fn insert(&mut self, email: impl Into<String>, busy: bool) {
        self.busy.insert(email.into(), busy);
    }

    /// Builder form of [`FreeBusy::insert`].
    pub fn with(mut self, email: impl Into<String>, busy: bool) -> Self {
        self.insert(email, busy);
        self
    }

    /// Returns true if the email was reported busy.
    pub fn is_busy(&self, email: &str) -> bool {
        self.busy.get(email).copied().unwrap_or(false)
    }

    /// Returns true if any queried email is busy.
    pub fn any_busy(&self) -> bool {
        self.busy.values().any(|busy| *busy)
    }

    /// Emails reported busy, sorted.
    pub fn busy_emails(&self) -> Vec<&str> {
        self.busy
            .iter()
            .filter(|(_, busy)| **busy)
            .map(|(email, _)| email.as_str())
            .collect()
    }
}

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe so the engine can work against
/// `&dyn CalendarProvider`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core abstraction for calendar backends.
///
/// Implementations must be `Send + Sync`. Errors are reported per call; the
/// caller decides whether a failure is fatal.
///
/// ```ignore
/// impl CalendarProvider for MyProvider {
///     fn name(&self) -> &str { "mine" }
///
///     fn list_events<'a>(
///         &'a self,
///         calendar_id: &'a str,
///         window: TimeWindow,
///     ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
///         Box::pin(async move { self.fetch(calendar_id, window).await })
///     }
///     // ...
/// }
/// ```
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g. `google`, `memory`).
    fn name(&self) -> &str;

    /// Reads calendar metadata: identifier (the owner identity) and timezone.
    fn calendar_info<'a>(&'a self, calendar_id: &'a str)
    -> BoxFuture<'a, ProviderResult<CalendarInfo>>;

    /// Returns the calendar's IANA timezone identifier.
    ///
    /// Defaults to the timezone in [`CalendarProvider::calendar_info`], or
    /// `UTC` when the calendar does not report one.
    fn timezone<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let info = self.calendar_info(calendar_id).await?;
            Ok(info.timezone_or_utc().to_string())
        })
    }

    /// Lists events overlapping `window`, ordered by start time.
    ///
    /// Recurring events are expanded into single instances and cancelled
    /// events are omitted.
    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;

    /// Reports, for each email, whether it has busy time inside `window`.
    fn query_free_busy<'a>(
        &'a self,
        emails: &'a [String],
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<FreeBusy>>;

    /// Moves an event to `slot`, keeping every other field unchanged.
    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        slot: Slot,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>>;
}

/// A provider that fails every call with the same error.
///
/// Drives a run down its failure paths without a reachable backend.
#[derive(Debug)]
pub struct ErrorProvider {
    name: String,
    error: ProviderError,
}

impl ErrorProvider {
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn fail<T: Send + 'static>(&self) -> BoxFuture<'_, ProviderResult<T>> {
        let error = self.error.detached().with_provider(&self.name);
        Box::pin(async move { Err(error) })
    }
}

impl CalendarProvider for ErrorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn calendar_info<'a>(&'a self, _calendar_id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        self.fail()
    }

    fn list_events<'a>(
        &'a self,
        _calendar_id: &'a str,
        _window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        self.fail()
    }

    fn query_free_busy<'a>(
        &'a self,
        _emails: &'a [String],
        _window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<FreeBusy>> {
        self.fail()
    }

    fn update_event<'a>(
        &'a self,
        _calendar_id: &'a str,
        _event_id: &'a str,
        _slot: Slot,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        self.fail()
    }
}
