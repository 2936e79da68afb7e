//! Property tests for planner invariants over random calendars.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use proptest::prelude::*;
use reshuffle_core::{CalendarEvent, EventTime, Slot, Transparency};
use reshuffle_providers::MemoryProvider;

use crate::planner::{Plan, RunReport, reschedule};
use crate::request::RescheduleRequest;

const ME: &str = "me@example.com";
const ATTENDEES: [&str; 3] = ["alice@example.com", "bob@example.com", "carol@example.com"];

#[derive(Debug, Clone)]
struct MeetingShape {
    day: u32,
    start_quarter: u32,
    quarters: u32,
    attendees: Vec<usize>,
}

#[derive(Debug, Clone)]
struct BusyShape {
    day: u32,
    start_quarter: u32,
    quarters: u32,
    who: Option<usize>,
    transparent: bool,
}

#[derive(Debug, Clone)]
struct Scenario {
    meetings: Vec<MeetingShape>,
    busy: Vec<BusyShape>,
    window_start: u32,
    window_hours: u32,
    blocked_days: Vec<u32>,
    candidate_days: Vec<u32>,
}

fn meeting_shape() -> impl Strategy<Value = MeetingShape> {
    // Late starts run past midnight into the next blocked day.
    (
        3u32..6,
        28u32..96,
        1u32..9,
        proptest::collection::vec(0usize..ATTENDEES.len(), 0..3),
    )
        .prop_map(|(day, start_quarter, quarters, attendees)| MeetingShape {
            day,
            start_quarter,
            quarters,
            attendees,
        })
}

fn busy_shape() -> impl Strategy<Value = BusyShape> {
    (
        6u32..9,
        28u32..72,
        1u32..16,
        proptest::option::of(0usize..ATTENDEES.len()),
        any::<bool>(),
    )
        .prop_map(|(day, start_quarter, quarters, who, transparent)| BusyShape {
            day,
            start_quarter,
            quarters,
            who,
            transparent,
        })
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (
        proptest::collection::vec(meeting_shape(), 0..8),
        proptest::collection::vec(busy_shape(), 0..10),
        7u32..12,
        1u32..10,
        proptest::sample::subsequence(vec![3u32, 4, 5], 1..=3).prop_shuffle(),
        proptest::sample::subsequence(vec![6u32, 7, 8], 1..=3),
    )
        .prop_map(
            |(meetings, busy, window_start, window_hours, blocked_days, candidate_days)| Scenario {
                meetings,
                busy,
                window_start,
                window_hours,
                blocked_days,
                candidate_days,
            },
        )
}

fn quarter(day: u32, q: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, day, 0, 0, 0).unwrap() + Duration::minutes(i64::from(q) * 15)
}

fn provider(scenario: &Scenario) -> MemoryProvider {
    let mut provider = MemoryProvider::new(ME, "UTC");
    for (i, shape) in scenario.meetings.iter().enumerate() {
        let start = quarter(shape.day, shape.start_quarter);
        let end = start + Duration::minutes(i64::from(shape.quarters) * 15);
        let mut event = CalendarEvent::new(
            format!("m{}", i),
            format!("Meeting {}", i),
            EventTime::from_utc(start),
            EventTime::from_utc(end),
            ME,
        )
        .with_organizer(ME);
        for &a in &shape.attendees {
            event = event.with_attendee(ATTENDEES[a]);
        }
        provider = provider.with_event(event);
    }
    for (i, shape) in scenario.busy.iter().enumerate() {
        let start = quarter(shape.day, shape.start_quarter);
        let end = start + Duration::minutes(i64::from(shape.quarters) * 15);
        provider = match shape.who {
            Some(a) => provider.with_busy(ATTENDEES[a], Slot::new(start, end)),
            None => {
                let transparency = if shape.transparent {
                    Transparency::Transparent
                } else {
                    Transparency::Opaque
                };
                provider.with_event(
                    CalendarEvent::new(
                        format!("busy{}", i),
                        "Busy",
                        EventTime::from_utc(start),
                        EventTime::from_utc(end),
                        ME,
                    )
                    .with_transparency(transparency),
                )
            }
        };
    }
    provider
}

fn dates(days: &[u32]) -> String {
    days.iter()
        .map(|d| format!("2025-02-{:02}", d))
        .collect::<Vec<_>>()
        .join(",")
}

fn request(scenario: &Scenario) -> RescheduleRequest {
    let end = (scenario.window_start + scenario.window_hours).min(23);
    RescheduleRequest::new(
        dates(&scenario.blocked_days),
        dates(&scenario.candidate_days),
        format!("{:02}:00", scenario.window_start),
        format!("{:02}:00", end),
    )
}

fn run(scenario: &Scenario) -> (MemoryProvider, RunReport) {
    let provider = provider(scenario);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let report = runtime.block_on(reschedule(&provider, &request(scenario)));
    (provider, report)
}

fn plan(report: &RunReport) -> &Plan {
    report.plan.as_ref().expect("valid scenarios always plan")
}

fn hm(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn assigned_slots_never_collide(scenario in scenario()) {
        let (_, report) = run(&scenario);
        let slots: Vec<Slot> = plan(&report).entries.iter().filter_map(|e| e.outcome.slot()).collect();
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                prop_assert_ne!(a.start, b.start);
                prop_assert!(!a.overlaps(b.start, b.end));
            }
        }
    }

    #[test]
    fn each_meeting_is_planned_at_most_once(scenario in scenario()) {
        let (_, report) = run(&scenario);
        let entries = &plan(&report).entries;
        let ids: HashSet<&str> = entries.iter().map(|e| e.meeting.id.as_str()).collect();
        prop_assert_eq!(ids.len(), entries.len());

        // Earlier blocked days are planned first.
        let order: Vec<usize> = entries
            .iter()
            .filter_map(|e| scenario.blocked_days.iter().position(|&d| e.blocked_day.day() == d))
            .collect();
        prop_assert_eq!(order.len(), entries.len());
        prop_assert!(order.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn assigned_slots_respect_window_grid_and_blackout(scenario in scenario()) {
        let (_, report) = run(&scenario);
        let end_hour = (scenario.window_start + scenario.window_hours).min(23);
        for entry in &plan(&report).entries {
            let Some(slot) = entry.outcome.slot() else { continue };
            prop_assert_eq!(slot.duration(), entry.meeting.duration());

            let date: NaiveDate = slot.start.date_naive();
            let window_start = date.and_time(hm(scenario.window_start)).and_utc();
            let window_end = date.and_time(hm(end_hour)).and_utc();
            prop_assert!(window_start <= slot.start && slot.end <= window_end);
            prop_assert_eq!((slot.start - window_start).num_minutes() % 15, 0);

            let lunch_start = date.and_time(hm(12)).and_utc();
            let lunch_end = date.and_time(hm(13)).and_utc();
            prop_assert!(!slot.overlaps(lunch_start, lunch_end));
        }
    }

    #[test]
    fn runs_are_deterministic_and_dry_runs_never_write(scenario in scenario()) {
        let (first_provider, first) = run(&scenario);
        let (_, second) = run(&scenario);
        prop_assert_eq!(plan(&first), plan(&second));
        prop_assert_eq!(first.render(), second.render());
        prop_assert!(first_provider.updates().is_empty());
    }

    #[test]
    fn live_run_writes_exactly_the_dry_run_plan(scenario in scenario()) {
        let (_, dry) = run(&scenario);
        let live_provider = provider(&scenario);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let live = runtime.block_on(reschedule(&live_provider, &request(&scenario).with_dry_run(false)));

        let dry_assignments = plan(&dry).assignments();
        let written: Vec<(String, Slot)> = live_provider.updates();
        let expected: Vec<(String, Slot)> = dry_assignments
            .into_iter()
            .map(|(id, slot)| (id.to_string(), slot))
            .collect();
        prop_assert_eq!(written, expected);
        prop_assert_eq!(plan(&live).errored(), 0);
    }
}
