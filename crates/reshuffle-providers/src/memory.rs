//! In-memory calendar provider.
//!
//! [`MemoryProvider`] keeps one calendar, its events and per-attendee busy
//! intervals in memory. It backs offline dry runs (loaded from a JSON
//! snapshot) and the engine's tests, where it can also be told to fail
//! specific operations and records every write it receives.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono_tz::Tz;
use reshuffle_core::{CalendarEvent, Slot, TimeWindow, parse_timezone};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider, FreeBusy};

const PROVIDER_NAME: &str = "memory";

/// Serialized form of a [`MemoryProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub calendar: CalendarInfo,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    /// Busy intervals per attendee email.
    #[serde(default)]
    pub busy: BTreeMap<String, Vec<Slot>>,
}

#[derive(Debug, Default)]
struct Failures {
    calendar_info: bool,
    list_events: bool,
    free_busy: bool,
    updates: BTreeSet<String>,
}

/// A calendar provider backed by in-memory data.
#[derive(Debug)]
pub struct MemoryProvider {
    calendar: CalendarInfo,
    events: Mutex<Vec<CalendarEvent>>,
    busy: BTreeMap<String, Vec<Slot>>,
    failures: Failures,
    updates: Mutex<Vec<(String, Slot)>>,
    free_busy_queries: AtomicUsize,
}

impl MemoryProvider {
    /// Creates an empty calendar owned by `owner` in `timezone`.
    pub fn new(owner: impl Into<String>, timezone: impl Into<String>) -> Self {
        let owner = owner.into();
        Self::from_snapshot(MemorySnapshot {
            calendar: CalendarInfo::new(owner.clone(), owner).with_timezone(timezone),
            events: Vec::new(),
            busy: BTreeMap::new(),
        })
    }

    /// Builds a provider from a snapshot.
    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        Self {
            calendar: snapshot.calendar,
            events: Mutex::new(snapshot.events),
            busy: snapshot.busy,
            failures: Failures::default(),
            updates: Mutex::new(Vec::new()),
            free_busy_queries: AtomicUsize::new(0),
        }
    }

    /// Parses a JSON snapshot.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let snapshot: MemorySnapshot = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("invalid calendar snapshot: {}", e))
                .with_provider(PROVIDER_NAME)
        })?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Loads a JSON snapshot from disk.
    pub fn load(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read calendar snapshot {}: {}",
                path.display(),
                e
            ))
            .with_provider(PROVIDER_NAME)
        })?;
        Self::from_json(&content)
    }

    /// Returns the current state as a snapshot.
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            calendar: self.calendar.clone(),
            events: self.events(),
            busy: self.busy.clone(),
        }
    }

    pub fn with_event(self, event: CalendarEvent) -> Self {
        lock(&self.events).push(event);
        self
    }

    pub fn with_events(self, events: impl IntoIterator<Item = CalendarEvent>) -> Self {
        lock(&self.events).extend(events);
        self
    }

    /// Marks `email` busy during `slot`.
    pub fn with_busy(mut self, email: impl Into<String>, slot: Slot) -> Self {
        self.busy.entry(email.into()).or_default().push(slot);
        self
    }

    /// Makes calendar metadata reads fail.
    pub fn failing_calendar_info(mut self) -> Self {
        self.failures.calendar_info = true;
        self
    }

    /// Makes event listing fail.
    pub fn failing_list_events(mut self) -> Self {
        self.failures.list_events = true;
        self
    }

    /// Makes free/busy queries fail.
    pub fn failing_free_busy(mut self) -> Self {
        self.failures.free_busy = true;
        self
    }

    /// Makes updates of `event_id` fail.
    pub fn failing_update(mut self, event_id: impl Into<String>) -> Self {
        self.failures.updates.insert(event_id.into());
        self
    }

    /// Current events, in insertion order.
    pub fn events(&self) -> Vec<CalendarEvent> {
        lock(&self.events).clone()
    }

    /// Every successful or attempted update, in call order.
    pub fn updates(&self) -> Vec<(String, Slot)> {
        lock(&self.updates).clone()
    }

    /// Number of free/busy queries received.
    pub fn free_busy_queries(&self) -> usize {
        self.free_busy_queries.load(Ordering::SeqCst)
    }

    fn calendar_tz(&self) -> Tz {
        parse_timezone(self.calendar.timezone_or_utc()).unwrap_or(Tz::UTC)
    }

    fn knows_calendar(&self, calendar_id: &str) -> bool {
        calendar_id == "primary" || calendar_id == self.calendar.id
    }

    fn unknown_calendar(&self, calendar_id: &str) -> ProviderError {
        ProviderError::not_found(format!("calendar {} not found", calendar_id))
            .with_provider(PROVIDER_NAME)
    }

    fn injected(&self, operation: &str) -> ProviderError {
        ProviderError::server(format!("{} unavailable", operation)).with_provider(PROVIDER_NAME)
    }

    fn list_events_sync(
        &self,
        calendar_id: &str,
        window: TimeWindow,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        if self.failures.list_events {
            return Err(self.injected("event listing"));
        }
        if !self.knows_calendar(calendar_id) {
            return Err(self.unknown_calendar(calendar_id));
        }
        let tz = self.calendar_tz();
        let mut events: Vec<CalendarEvent> = lock(&self.events)
            .iter()
            .filter(|event| window.overlaps(event.start.resolve(&tz), event.end.resolve(&tz)))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start.resolve(&tz).cmp(&b.start.resolve(&tz)));
        debug!(
            "memory provider listed {} events in {} - {}",
            events.len(),
            window.start,
            window.end
        );
        Ok(events)
    }

    fn free_busy_sync(&self, emails: &[String], window: TimeWindow) -> ProviderResult<FreeBusy> {
        self.free_busy_queries.fetch_add(1, Ordering::SeqCst);
        if self.failures.free_busy {
            return Err(self.injected("free/busy"));
        }
        let mut result = FreeBusy::new();
        for email in emails {
            if let Some(intervals) = self.busy.get(email) {
                let busy = intervals.iter().any(|slot| slot.overlaps_window(&window));
                result.insert(email.clone(), busy);
            }
        }
        Ok(result)
    }

    fn update_sync(
        &self,
        calendar_id: &str,
        event_id: &str,
        slot: Slot,
    ) -> ProviderResult<CalendarEvent> {
        lock(&self.updates).push((event_id.to_string(), slot));
        if self.failures.updates.contains(event_id) {
            return Err(ProviderError::calendar(format!("event {} is read-only", event_id))
                .with_provider(PROVIDER_NAME));
        }
        if !self.knows_calendar(calendar_id) {
            return Err(self.unknown_calendar(calendar_id));
        }
        let mut events = lock(&self.events);
        let event = events
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or_else(|| {
                ProviderError::not_found(format!("event {} not found", event_id))
                    .with_provider(PROVIDER_NAME)
            })?;
        event.start = reshuffle_core::EventTime::from_utc(slot.start);
        event.end = reshuffle_core::EventTime::from_utc(slot.end);
        Ok(event.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CalendarProvider for MemoryProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn calendar_info<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(async move {
            if self.failures.calendar_info {
                return Err(self.injected("calendar metadata"));
            }
            if !self.knows_calendar(calendar_id) {
                return Err(self.unknown_calendar(calendar_id));
            }
            Ok(self.calendar.clone())
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move { self.list_events_sync(calendar_id, window) })
    }

    fn query_free_busy<'a>(
        &'a self,
        emails: &'a [String],
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<FreeBusy>> {
        Box::pin(async move { self.free_busy_sync(emails, window) })
    }

    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        slot: Slot,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(async move { self.update_sync(calendar_id, event_id, slot) })
    }
}
