//! Engine error types.

use reshuffle_core::TimeError;
use reshuffle_providers::ProviderError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Malformed user input. Raised before any provider I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Invalid blocked dates format. Use a comma-separated list of YYYY-MM-DD.")]
    BlockedDates { input: String },

    #[error("Invalid candidate dates format. Use a comma-separated list of YYYY-MM-DD.")]
    CandidateDates { input: String },

    #[error("Invalid time slot format. Use HH:MM.")]
    TimeOfDay { input: String },

    #[error("Time slot start {start} must be before its end {end}.")]
    EmptyWindow { start: String, end: String },

    #[error("Invalid schedule settings: {0}")]
    Settings(String),
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Failed to fetch calendar timezone: {0}")]
    Timezone(#[source] ProviderError),

    #[error("Failed to fetch calendar owner: {0}")]
    Owner(#[source] ProviderError),

    #[error(transparent)]
    Time(#[from] TimeError),
}
