//! CalendarProvider trait and implementations.
//!
//! This crate is the boundary between the rescheduling engine and calendar
//! backends:
//!
//! - [`CalendarProvider`] - the trait every backend implements
//! - [`ProviderError`] - error type shared by all backends
//! - [`MemoryProvider`] - in-memory backend for offline runs and tests
//! - [`google::GoogleProvider`] - Google Calendar API v3 (feature `google`)
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐
//! │  Google API     │    │  JSON snapshot   │
//! └────────┬────────┘    └────────┬─────────┘
//!          ▼                      ▼
//! ┌─────────────────┐    ┌──────────────────┐
//! │ GoogleProvider  │    │  MemoryProvider  │
//! └────────┬────────┘    └────────┬─────────┘
//!          └────────┬─────────────┘
//!                   ▼
//!          CalendarProvider ──► reshuffle-engine
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::{MemoryProvider, MemorySnapshot};
pub use provider::{BoxFuture, CalendarInfo, CalendarProvider, ErrorProvider, FreeBusy};
