//! Core types: time, events, meeting selection, reservation ledger

pub mod event;
pub mod ledger;
pub mod selector;
pub mod time;
pub mod tracing;

pub use event::{CalendarEvent, EventCategory, Meeting, Transparency};
pub use ledger::ReservationLedger;
pub use selector::select_meetings;
pub use time::{local_instant, parse_timezone, EventTime, Slot, TimeError, TimeWindow};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
