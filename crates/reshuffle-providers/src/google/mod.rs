//! Google Calendar provider implementation.
//!
//! [`GoogleProvider`] talks to the Google Calendar API v3:
//!
//! - `calendars.get` for the owner identity and timezone
//! - `events.list` (single instances, ordered by start) for event reads
//! - `freebusy.query` for attendee availability
//! - `events.patch` to move a meeting, touching only its start and end
//!
//! # Authentication
//!
//! Tokens come from a token file (or inline JSON) in either the tool's own
//! format or Google's authorized-user `token.json`. Expired access tokens
//! are refreshed with the refresh token, using client credentials from the
//! configuration or from the token file itself.
//!
//! ```ignore
//! use reshuffle_providers::google::{GoogleConfig, GoogleProvider};
//!
//! let config = GoogleConfig::new().with_token_path("/home/me/.config/reshuffle/token.json");
//! let provider = GoogleProvider::new(config)?;
//! let tz = provider.timezone("primary").await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use config::{GoogleConfig, OAuthCredentials, TokenSource};
pub use provider::GoogleProvider;
pub use tokens::{TokenInfo, TokenStorage};
