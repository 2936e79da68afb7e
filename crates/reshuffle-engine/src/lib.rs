//! Engine: slot search and rescheduling planner.
//!
//! This crate moves meetings off blocked days:
//! - Input parsing and validation ([`RescheduleRequest`])
//! - Per-slot availability checks against blackout, owner events and attendee free/busy
//! - Greedy earliest-first slot search over candidate windows
//! - A planner that shares one reservation ledger across the whole run
//!
//! # Example
//!
//! ```rust,no_run
//! use reshuffle_engine::{RescheduleRequest, reschedule};
//! use reshuffle_providers::MemoryProvider;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let provider = MemoryProvider::new("me@example.com", "Europe/Paris");
//!     let request = RescheduleRequest::new("2025-02-05", "2025-02-06,2025-02-07", "09:00", "17:00");
//!     let report = reschedule(&provider, &request).await;
//!     println!("{}", report.render());
//! }
//! ```

mod availability;
mod error;
mod planner;
mod request;
mod search;
mod transcript;

#[cfg(test)]
mod properties;

pub use availability::{AvailabilityChecker, Verdict};
pub use error::{EngineError, EngineResult, RequestError};
pub use planner::{Outcome, Plan, PlanEntry, ReschedulePlanner, RunReport, reschedule};
pub use request::{ParsedRequest, RescheduleRequest, ScheduleSettings, parse_time};
pub use search::{CandidateWindow, SlotSearch};
pub use transcript::{Level, Transcript};
