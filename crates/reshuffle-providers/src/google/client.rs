//! Google Calendar API client.
//!
//! Low-level HTTP client for the Calendar API v3: request building, status
//! mapping and conversion of API payloads into [`CalendarEvent`]s.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reshuffle_core::{CalendarEvent, EventCategory, EventTime, Slot, TimeWindow, Transparency};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{CalendarInfo, FreeBusy};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new client with the given access token.
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Reads calendar metadata (`calendars.get`).
    pub async fn get_calendar(&self, calendar_id: &str) -> ProviderResult<CalendarInfo> {
        let url = format!(
            "{}/calendars/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );
        let request = self.http_client.get(&url).bearer_auth(&self.access_token);
        let body = send(request).await?;
        let calendar: ApiCalendar = parse(&body)?;

        let mut info = CalendarInfo::new(calendar.id, calendar.summary.unwrap_or_default());
        info.timezone = calendar.time_zone;
        Ok(info)
    }

    /// Lists single event instances overlapping `window`, ordered by start.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        window: TimeWindow,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, window, page_token.as_deref())
                .await?;

            all_events.extend(
                page.items
                    .into_iter()
                    .filter_map(|event| convert_event(event, calendar_id)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "fetched {} events from calendar {}",
            all_events.len(),
            calendar_id
        );
        Ok(all_events)
    }

    async fn list_events_page(
        &self,
        calendar_id: &str,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let body = send(request).await?;
        parse(&body)
    }

    /// Queries busy time for `emails` over `window` (`freebusy.query`).
    pub async fn query_free_busy(
        &self,
        emails: &[String],
        window: TimeWindow,
    ) -> ProviderResult<FreeBusy> {
        let url = format!("{}/freeBusy", CALENDAR_API_BASE);
        let payload = FreeBusyRequest {
            time_min: window.start.to_rfc3339(),
            time_max: window.end.to_rfc3339(),
            items: emails
                .iter()
                .map(|email| FreeBusyItem { id: email.clone() })
                .collect(),
        };
        let request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload);
        let body = send(request).await?;
        let response: FreeBusyResponse = parse(&body)?;
        Ok(convert_free_busy(response))
    }

    /// Moves an event by patching only its start and end.
    pub async fn patch_event_time(
        &self,
        calendar_id: &str,
        event_id: &str,
        slot: Slot,
        send_updates: &str,
    ) -> ProviderResult<CalendarEvent> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );
        let payload = EventTimePatch {
            start: ApiDateTime {
                date_time: slot.start.to_rfc3339(),
            },
            end: ApiDateTime {
                date_time: slot.end.to_rfc3339(),
            },
        };
        let request = self
            .http_client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .query(&[("sendUpdates", send_updates)])
            .json(&payload);
        let body = send(request).await?;
        let event: ApiEvent = parse(&body)?;
        convert_event(event, calendar_id).ok_or_else(|| {
            ProviderError::invalid_response(format!("updated event {} is not usable", event_id))
        })
    }
}

/// Sends a request and returns the body of a successful response.
async fn send(request: reqwest::RequestBuilder) -> ProviderResult<String> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::network("request timeout")
        } else if e.is_connect() {
            ProviderError::network(format!("connection failed: {}", e))
        } else {
            ProviderError::network(format!("request failed: {}", e))
        }
    })?;

    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ProviderError::authentication("access token expired or invalid"));
    }

    if status == reqwest::StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::authorization(format!("access denied: {}", body)));
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::not_found("calendar or event not found"));
    }

    if status.is_client_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::calendar(format!(
            "request rejected ({}): {}",
            status, body
        )));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::server(format!(
            "API error ({}): {}",
            status, body
        )));
    }

    response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> ProviderResult<T> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Converts an API event; returns `None` for cancelled or malformed events.
fn convert_event(event: ApiEvent, calendar_id: &str) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let start = convert_time(&event.start, &id, "start")?;
    let end = convert_time(&event.end, &id, "end")?;

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.email)
        .collect();

    let mut converted = CalendarEvent::new(
        id,
        event.summary.unwrap_or_else(|| "No Summary".to_string()),
        start,
        end,
        calendar_id,
    )
    .with_attendees(attendees)
    .with_category(EventCategory::from_provider_str(
        event.event_type.as_deref().unwrap_or("default"),
    ))
    .with_transparency(Transparency::from_provider_str(
        event.transparency.as_deref().unwrap_or("opaque"),
    ));

    converted.organizer = event.organizer.and_then(|o| o.email);
    Some(converted)
}

fn convert_time(time: &ApiEventTime, id: &str, which: &str) -> Option<EventTime> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => DateTime::parse_from_rfc3339(dt)
            .map(EventTime::from_local)
            .map_err(|e| warn!("event {}: failed to parse {} time: {}", id, which, e))
            .ok(),
        (None, Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(EventTime::from_date)
            .map_err(|e| warn!("event {}: failed to parse {} date: {}", id, which, e))
            .ok(),
        (None, None) => {
            warn!("event {} has no {} time", id, which);
            None
        }
    }
}

/// Attendees with busy periods are busy. Per-calendar errors (unknown or
/// private calendars) carry no busy periods and count as free.
fn convert_free_busy(response: FreeBusyResponse) -> FreeBusy {
    let mut result = FreeBusy::new();
    for (email, calendar) in response.calendars {
        if !calendar.errors.is_empty() {
            let reasons: Vec<_> = calendar
                .errors
                .iter()
                .map(|e| e.reason.as_deref().unwrap_or("unknown"))
                .collect();
            warn!("free/busy unavailable for {}: {}", email, reasons.join(", "));
        }
        result.insert(email, !calendar.busy.is_empty());
    }
    result
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    status: Option<String>,
    event_type: Option<String>,
    transparency: Option<String>,
    organizer: Option<ApiPerson>,
    attendees: Option<Vec<ApiPerson>>,
    start: ApiEventTime,
    end: ApiEventTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPerson {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendar {
    id: String,
    summary: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest {
    time_min: String,
    time_max: String,
    items: Vec<FreeBusyItem>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: BTreeMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<FreeBusyPeriod>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct FreeBusyPeriod {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventTimePatch {
    start: ApiDateTime,
    end: ApiDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiDateTime {
    date_time: String,
}
