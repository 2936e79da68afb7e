//! Rescheduling planner and top-level entry point.
//!
//! [`reschedule`] parses the request, looks up the calendar timezone and
//! owner, then hands the blocked days to a [`ReschedulePlanner`]. Meetings
//! are handled strictly in order: earlier blocked days, and earlier meetings
//! within a day, get first claim on slots through the shared ledger.

use std::collections::HashSet;

use chrono::NaiveDate;
use chrono_tz::Tz;
use reshuffle_core::{Meeting, ReservationLedger, Slot, TimeWindow, parse_timezone, select_meetings};
use reshuffle_providers::CalendarProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::request::{RescheduleRequest, ScheduleSettings};
use crate::search::{CandidateWindow, SlotSearch};
use crate::transcript::Transcript;

/// Terminal state of one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A slot was found. `committed` is false in dry runs.
    Resolved { slot: Slot, committed: bool },
    /// No candidate window had a free slot.
    Unresolved,
    /// A slot was found and reserved but writing it failed.
    Errored { slot: Slot, error: String },
}

impl Outcome {
    /// The slot this meeting claimed, if any.
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Self::Resolved { slot, .. } | Self::Errored { slot, .. } => Some(*slot),
            Self::Unresolved => None,
        }
    }
}

/// One meeting's line in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub meeting: Meeting,
    pub blocked_day: NaiveDate,
    pub original: Slot,
    pub outcome: Outcome,
}

/// Result of a planner run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub timezone: String,
    pub dry_run: bool,
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn resolved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Resolved { .. }))
    }

    pub fn unresolved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Unresolved))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Errored { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    /// Meeting id to new slot, for resolved meetings, in processing order.
    pub fn assignments(&self) -> Vec<(&str, Slot)> {
        self.entries
            .iter()
            .filter_map(|e| match e.outcome {
                Outcome::Resolved { slot, .. } => Some((e.meeting.id.as_str(), slot)),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Moves meetings off blocked days into candidate windows.
pub struct ReschedulePlanner<'a> {
    provider: &'a dyn CalendarProvider,
    calendar_id: &'a str,
    organizer: &'a str,
    tz: Tz,
    settings: ScheduleSettings,
    dry_run: bool,
}

impl<'a> ReschedulePlanner<'a> {
    pub fn new(
        provider: &'a dyn CalendarProvider,
        calendar_id: &'a str,
        organizer: &'a str,
        tz: Tz,
    ) -> Self {
        Self {
            provider,
            calendar_id,
            organizer,
            tz,
            settings: ScheduleSettings::default(),
            dry_run: true,
        }
    }

    pub fn with_settings(mut self, settings: ScheduleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs every blocked day against `windows` with a fresh ledger.
    ///
    /// Each meeting is planned at most once, on the first blocked day that
    /// lists it.
    pub async fn plan(
        &self,
        blocked_days: &[NaiveDate],
        windows: &[CandidateWindow],
        transcript: &mut Transcript,
    ) -> Plan {
        let search = SlotSearch::new(self.provider, self.calendar_id, self.tz, self.settings.step());
        let mut ledger = ReservationLedger::new();
        let mut entries = Vec::new();
        let mut planned: HashSet<String> = HashSet::new();

        for &day in blocked_days {
            let meetings: Vec<Meeting> = self
                .meetings_on(day, transcript)
                .await
                .into_iter()
                .filter(|meeting| {
                    let first = planned.insert(meeting.id.clone());
                    if !first {
                        debug!("meeting '{}' already planned in this run", meeting.title);
                    }
                    first
                })
                .collect();
            transcript.info(format!("Meetings to reschedule on {}: {}", day, meetings.len()));
            if meetings.is_empty() {
                transcript.warning(format!("No meetings found to reschedule on {}.", day));
                continue;
            }

            for meeting in meetings {
                transcript.debug(format!(
                    "Attempting to find an available slot for meeting: '{}' with attendees: {}",
                    meeting.title,
                    meeting.attendees.join(", ")
                ));

                let mut found = None;
                for window in windows {
                    found = search
                        .find(window, meeting.duration(), &meeting.attendees, &mut ledger, transcript)
                        .await;
                    if found.is_some() {
                        break;
                    }
                }

                let outcome = match found {
                    Some(slot) => self.commit(&meeting, slot, transcript).await,
                    None => {
                        transcript.warning(format!(
                            "No available slot found for meeting: {} on any of the acceptable dates.",
                            meeting.title
                        ));
                        Outcome::Unresolved
                    }
                };

                entries.push(PlanEntry {
                    original: meeting.slot(),
                    meeting,
                    blocked_day: day,
                    outcome,
                });
            }
        }

        let plan = Plan {
            timezone: self.tz.name().to_string(),
            dry_run: self.dry_run,
            entries,
        };
        transcript.info(format!(
            "Summary: {} resolved, {} unresolved, {} errored",
            plan.resolved(),
            plan.unresolved(),
            plan.errored()
        ));
        plan
    }

    /// Owner-organized meetings on a blocked day. Listing failures yield none.
    async fn meetings_on(&self, day: NaiveDate, transcript: &mut Transcript) -> Vec<Meeting> {
        let range = match TimeWindow::for_date(day, &self.tz) {
            Ok(range) => range,
            Err(e) => {
                transcript.error(format!("Cannot resolve {}: {}", day, e));
                return Vec::new();
            }
        };
        match self.provider.list_events(self.calendar_id, range).await {
            Ok(events) => {
                debug!("found {} events on {}", events.len(), day);
                select_meetings(&events, self.organizer, &range)
            }
            Err(e) => {
                transcript.error(format!("Failed to list events on {}: {}", day, e));
                Vec::new()
            }
        }
    }

    async fn commit(&self, meeting: &Meeting, slot: Slot, transcript: &mut Transcript) -> Outcome {
        let when = slot.display_in(&self.tz);
        if self.dry_run {
            transcript.info(format!(
                "Dry run: Meeting '{}' would be rescheduled to {}",
                meeting.title, when
            ));
            return Outcome::Resolved {
                slot,
                committed: false,
            };
        }

        match self
            .provider
            .update_event(self.calendar_id, &meeting.id, slot)
            .await
        {
            Ok(_) => {
                transcript.info(format!("Rescheduled meeting: {} to {}", meeting.title, when));
                Outcome::Resolved {
                    slot,
                    committed: true,
                }
            }
            Err(e) => {
                transcript.error(format!(
                    "Failed to reschedule meeting: {} to {}: {}",
                    meeting.title, when, e
                ));
                Outcome::Errored {
                    slot,
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Transcript plus plan of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub transcript: Transcript,
    /// `None` when the run aborted before planning.
    pub plan: Option<Plan>,
}

impl RunReport {
    /// The newline-joined transcript.
    pub fn render(&self) -> String {
        self.transcript.render()
    }

    /// True when planning ran and nothing was logged at error level.
    pub fn succeeded(&self) -> bool {
        self.plan.is_some() && !self.transcript.has_errors()
    }
}

/// Runs a full rescheduling pass. Never fails; errors end up in the transcript.
pub async fn reschedule(provider: &dyn CalendarProvider, request: &RescheduleRequest) -> RunReport {
    let mut transcript = if request.verbose {
        Transcript::verbose()
    } else {
        Transcript::new()
    };

    let plan = match run(provider, request, &mut transcript).await {
        Ok(plan) => Some(plan),
        Err(e) => {
            transcript.error(e.to_string());
            None
        }
    };

    RunReport { transcript, plan }
}

async fn run(
    provider: &dyn CalendarProvider,
    request: &RescheduleRequest,
    transcript: &mut Transcript,
) -> EngineResult<Plan> {
    let parsed = request.parse()?;
    let calendar_id = request.calendar_id.as_str();

    let tz_name = provider
        .timezone(calendar_id)
        .await
        .map_err(EngineError::Timezone)?;
    let tz = parse_timezone(&tz_name)?;
    transcript.info(format!("Using calendar timezone: {}", tz.name()));

    let organizer = match &request.organizer {
        Some(organizer) => organizer.clone(),
        None => {
            provider
                .calendar_info(calendar_id)
                .await
                .map_err(EngineError::Owner)?
                .id
        }
    };
    info!("rescheduling meetings organized by {}", organizer);

    let mut windows = Vec::with_capacity(parsed.candidate_days.len());
    for &date in &parsed.candidate_days {
        match CandidateWindow::new(
            date,
            parsed.window_start,
            parsed.window_end,
            &request.settings,
            &tz,
        ) {
            Ok(window) => windows.push(window),
            Err(e) => transcript.warning(format!("Skipping candidate date {}: {}", date, e)),
        }
    }

    let planner = ReschedulePlanner::new(provider, calendar_id, &organizer, tz)
        .with_settings(request.settings)
        .with_dry_run(request.dry_run);
    Ok(planner.plan(&parsed.blocked_days, &windows, transcript).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use reshuffle_core::{CalendarEvent, EventCategory, EventTime};
    use reshuffle_providers::{ErrorProvider, MemoryProvider, ProviderError};

    const ME: &str = "me@example.com";
    const BLOCKED: &str = "2025-02-05";
    const CANDIDATE: &str = "2025-02-06";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, day, h, m, 0).unwrap()
    }

    fn meeting(id: &str, h: u32, minutes: i64) -> CalendarEvent {
        let start = at(5, h, 0);
        CalendarEvent::new(
            id,
            format!("Meeting {}", id),
            EventTime::from_utc(start),
            EventTime::from_utc(start + Duration::minutes(minutes)),
            ME,
        )
        .with_organizer(ME)
        .with_attendee(ME)
    }

    fn request(candidates: &str, start: &str, end: &str) -> RescheduleRequest {
        RescheduleRequest::new(BLOCKED, candidates, start, end)
    }

    fn resolved(report: &RunReport) -> Vec<(String, Slot)> {
        report
            .plan
            .as_ref()
            .unwrap()
            .assignments()
            .into_iter()
            .map(|(id, slot)| (id.to_string(), slot))
            .collect()
    }

    #[tokio::test]
    async fn one_meeting_takes_first_grid_slot() {
        let provider = MemoryProvider::new(ME, "UTC").with_event(meeting("a", 10, 30));
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "17:00")).await;

        assert_eq!(
            resolved(&report),
            vec![("a".to_string(), Slot::new(at(6, 9, 0), at(6, 9, 30)))]
        );
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn blackout_pushes_slot_past_lunch() {
        let provider = MemoryProvider::new(ME, "UTC").with_event(meeting("a", 10, 30));
        let report = reschedule(&provider, &request(CANDIDATE, "11:45", "14:00")).await;

        assert_eq!(
            resolved(&report),
            vec![("a".to_string(), Slot::new(at(6, 13, 0), at(6, 13, 30)))]
        );
    }

    #[tokio::test]
    async fn second_meeting_gets_next_slot() {
        let provider = MemoryProvider::new(ME, "UTC")
            .with_events([meeting("a", 10, 30), meeting("b", 14, 30)]);
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "17:00")).await;

        assert_eq!(
            resolved(&report),
            vec![
                ("a".to_string(), Slot::new(at(6, 9, 0), at(6, 9, 30))),
                ("b".to_string(), Slot::new(at(6, 9, 30), at(6, 10, 0))),
            ]
        );
    }

    #[tokio::test]
    async fn busy_attendee_falls_through_to_next_day() {
        let provider = MemoryProvider::new(ME, "UTC")
            .with_event(meeting("a", 10, 30).with_attendee("alice@example.com"))
            .with_busy("alice@example.com", Slot::new(at(6, 0, 0), at(7, 0, 0)));
        let report = reschedule(
            &provider,
            &request("2025-02-06,2025-02-07", "09:00", "17:00"),
        )
        .await;

        assert_eq!(
            resolved(&report),
            vec![("a".to_string(), Slot::new(at(7, 9, 0), at(7, 9, 30)))]
        );
    }

    #[tokio::test]
    async fn no_free_slot_is_unresolved_and_run_continues() {
        let provider = MemoryProvider::new(ME, "UTC")
            .with_events([meeting("long", 9, 120), meeting("short", 14, 30)]);
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "10:00")).await;

        let plan = report.plan.as_ref().unwrap();
        assert_eq!(plan.entries[0].outcome, Outcome::Unresolved);
        assert_eq!(plan.unresolved(), 1);
        assert_eq!(plan.resolved(), 1);
        assert!(report.render().contains(
            "WARNING: No available slot found for meeting: Meeting long on any of the acceptable dates."
        ));
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn dry_run_matches_live_run_without_writing() {
        let events = [meeting("a", 10, 30), meeting("b", 11, 60)];

        let dry = MemoryProvider::new(ME, "UTC").with_events(events.clone());
        let dry_report = reschedule(&dry, &request(CANDIDATE, "09:00", "17:00")).await;
        assert!(dry.updates().is_empty());

        let live = MemoryProvider::new(ME, "UTC").with_events(events);
        let live_report = reschedule(
            &live,
            &request(CANDIDATE, "09:00", "17:00").with_dry_run(false),
        )
        .await;

        assert_eq!(resolved(&dry_report), resolved(&live_report));
        assert_eq!(
            live.updates(),
            resolved(&live_report)
        );
        assert!(!dry_report.plan.unwrap().entries.iter().any(|e| matches!(
            e.outcome,
            Outcome::Resolved { committed: true, .. }
        )));
    }

    #[tokio::test]
    async fn meeting_crossing_midnight_is_planned_once() {
        let start = at(5, 23, 30);
        let late = CalendarEvent::new(
            "late",
            "Late sync",
            EventTime::from_utc(start),
            EventTime::from_utc(start + Duration::hours(1)),
            ME,
        )
        .with_organizer(ME);
        let blocked = "2025-02-05,2025-02-06";

        let dry = MemoryProvider::new(ME, "UTC").with_event(late.clone());
        let dry_report =
            reschedule(&dry, &RescheduleRequest::new(blocked, "2025-02-10", "09:00", "17:00")).await;
        let live = MemoryProvider::new(ME, "UTC").with_event(late);
        let live_report = reschedule(
            &live,
            &RescheduleRequest::new(blocked, "2025-02-10", "09:00", "17:00").with_dry_run(false),
        )
        .await;

        let plan = dry_report.plan.as_ref().unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].blocked_day, date(2025, 2, 5));
        assert_eq!(
            resolved(&dry_report),
            vec![("late".to_string(), Slot::new(at(10, 9, 0), at(10, 10, 0)))]
        );
        assert_eq!(resolved(&dry_report), resolved(&live_report));
        assert_eq!(live.updates(), resolved(&live_report));
        assert!(dry_report.render().contains("INFO: Meetings to reschedule on 2025-02-06: 0"));
    }

    #[tokio::test]
    async fn repeated_blocked_date_plans_each_meeting_once() {
        let provider = MemoryProvider::new(ME, "UTC").with_event(meeting("a", 10, 30));
        let report = reschedule(
            &provider,
            &RescheduleRequest::new("2025-02-05,2025-02-05", CANDIDATE, "09:00", "17:00"),
        )
        .await;

        assert_eq!(
            resolved(&report),
            vec![("a".to_string(), Slot::new(at(6, 9, 0), at(6, 9, 30)))]
        );
        assert!(report.render().contains("INFO: Summary: 1 resolved, 0 unresolved, 0 errored"));
    }

    #[tokio::test]
    async fn earlier_blocked_day_gets_first_claim() {
        let later = CalendarEvent::new(
            "later",
            "Meeting later",
            EventTime::from_utc(at(4, 10, 0)),
            EventTime::from_utc(at(4, 11, 0)),
            ME,
        )
        .with_organizer(ME);
        let provider = MemoryProvider::new(ME, "UTC").with_events([meeting("first", 10, 60), later]);

        // Only one hour fits in the window, so the second day loses.
        let report = reschedule(
            &provider,
            &RescheduleRequest::new("2025-02-05,2025-02-04", CANDIDATE, "09:00", "10:00"),
        )
        .await;

        let plan = report.plan.as_ref().unwrap();
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].meeting.id, "first");
        assert_eq!(
            plan.entries[0].outcome,
            Outcome::Resolved {
                slot: Slot::new(at(6, 9, 0), at(6, 10, 0)),
                committed: false
            }
        );
        assert_eq!(plan.entries[1].meeting.id, "later");
        assert_eq!(plan.entries[1].outcome, Outcome::Unresolved);
    }

    #[tokio::test]
    async fn failed_commit_keeps_slot_consumed() {
        let provider = MemoryProvider::new(ME, "UTC")
            .with_events([meeting("a", 10, 30), meeting("b", 14, 30)])
            .failing_update("a");
        let report = reschedule(
            &provider,
            &request(CANDIDATE, "09:00", "17:00").with_dry_run(false),
        )
        .await;

        let plan = report.plan.as_ref().unwrap();
        assert!(matches!(
            plan.entries[0].outcome,
            Outcome::Errored { slot, .. } if slot.start == at(6, 9, 0)
        ));
        assert_eq!(
            plan.entries[1].outcome,
            Outcome::Resolved {
                slot: Slot::new(at(6, 9, 30), at(6, 10, 0)),
                committed: true
            }
        );
        assert_eq!(plan.errored(), 1);
        assert!(!report.succeeded());
    }

    #[tokio::test]
    async fn only_owner_organized_standard_meetings_move() {
        let provider = MemoryProvider::new(ME, "UTC").with_events([
            meeting("mine", 9, 30),
            meeting("theirs", 10, 30).with_organizer("boss@example.com"),
            meeting("focus", 11, 60).with_category(EventCategory::FocusTime),
        ]);
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "17:00")).await;

        let ids: Vec<_> = resolved(&report).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["mine"]);
    }

    #[tokio::test]
    async fn organizer_override_replaces_calendar_owner() {
        let provider = MemoryProvider::new(ME, "UTC")
            .with_event(meeting("delegated", 9, 30).with_organizer("assistant@example.com"));
        let report = reschedule(
            &provider,
            &request(CANDIDATE, "09:00", "17:00").with_organizer("assistant@example.com"),
        )
        .await;

        assert_eq!(resolved(&report).len(), 1);
    }

    #[tokio::test]
    async fn invalid_input_aborts_before_provider_io() {
        let provider = MemoryProvider::new(ME, "UTC").failing_calendar_info();
        let report = reschedule(&provider, &request(CANDIDATE, "9am", "17:00")).await;

        assert!(report.plan.is_none());
        assert_eq!(report.render(), "ERROR: Invalid time slot format. Use HH:MM.");
    }

    #[tokio::test]
    async fn timezone_failure_aborts_run() {
        let provider = MemoryProvider::new(ME, "UTC")
            .with_event(meeting("a", 10, 30))
            .failing_calendar_info();
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "17:00")).await;

        assert!(report.plan.is_none());
        assert!(
            report
                .render()
                .starts_with("ERROR: Failed to fetch calendar timezone:")
        );
    }

    #[tokio::test]
    async fn unreachable_backend_fails_the_run() {
        let provider = ErrorProvider::new("google", ProviderError::network("connection refused"));
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "17:00")).await;

        assert!(!report.succeeded());
        assert!(report.plan.is_none());
        assert!(report.render().contains("connection refused"));
    }

    #[tokio::test]
    async fn listing_failure_is_logged_and_not_fatal() {
        let provider = MemoryProvider::new(ME, "UTC").failing_list_events();
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "17:00")).await;

        let plan = report.plan.as_ref().unwrap();
        assert!(plan.entries.is_empty());
        assert!(report.render().contains("ERROR: Failed to list events on 2025-02-05"));
    }

    #[tokio::test]
    async fn plan_serializes_outcomes_with_status_tag() {
        let provider = MemoryProvider::new(ME, "UTC").with_event(meeting("a", 10, 30));
        let report = reschedule(&provider, &request(CANDIDATE, "09:00", "17:00")).await;

        let json = report.plan.unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["timezone"], "UTC");
        assert_eq!(value["entries"][0]["outcome"]["status"], "resolved");
        assert_eq!(value["entries"][0]["outcome"]["committed"], false);
    }

    #[tokio::test]
    async fn dry_run_transcript() {
        let provider = MemoryProvider::new(ME, "Europe/Paris").with_events([
            meeting("a", 9, 30),
            meeting("b", 13, 45).with_attendee("alice@example.com"),
        ]);
        let request = RescheduleRequest::new("2025-02-05,2025-02-07", CANDIDATE, "11:30", "14:00")
            .with_calendar_id(ME);
        let report = reschedule(&provider, &request).await;

        insta::assert_snapshot!(report.render(), @r"
        INFO: Using calendar timezone: Europe/Paris
        INFO: Meetings to reschedule on 2025-02-05: 2
        INFO: Dry run: Meeting 'Meeting a' would be rescheduled to 2025-02-06 11:30-12:00 (Europe/Paris)
        INFO: Dry run: Meeting 'Meeting b' would be rescheduled to 2025-02-06 13:00-13:45 (Europe/Paris)
        INFO: Meetings to reschedule on 2025-02-07: 0
        WARNING: No meetings found to reschedule on 2025-02-07.
        INFO: Summary: 2 resolved, 0 unresolved, 0 errored
        ");
    }
}
