//! Google Calendar provider configuration.

use std::path::PathBuf;
use std::time::Duration;

/// OAuth 2.0 client credentials used to refresh access tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Checks that the credentials look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Where the provider reads its OAuth tokens from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// A token file on disk; refreshed tokens are written back.
    File(PathBuf),
    /// Token JSON handed over directly (e.g. from a secret store); refreshed
    /// tokens are kept in memory only.
    Inline(String),
}

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Client credentials. When absent, the ones embedded in the token
    /// file are used.
    pub credentials: Option<OAuthCredentials>,

    /// Token location.
    pub tokens: TokenSource,

    /// Calendar whose meetings are rescheduled. Defaults to `primary`.
    pub calendar_id: String,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Whether Google emails attendees when a meeting moves.
    pub notify_attendees: bool,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Scope the token must grant: read and write access to calendars.
    pub const SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration reading tokens from the default token path.
    pub fn new() -> Self {
        Self {
            credentials: None,
            tokens: TokenSource::File(Self::default_token_path()),
            calendar_id: "primary".to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("reshuffle/{}", env!("CARGO_PKG_VERSION")),
            notify_attendees: true,
        }
    }

    /// Returns `~/.local/share/reshuffle/google-token.json`.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reshuffle")
            .join("google-token.json")
    }

    pub fn with_credentials(mut self, credentials: OAuthCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokens = TokenSource::File(path.into());
        self
    }

    pub fn with_token_json(mut self, json: impl Into<String>) -> Self {
        self.tokens = TokenSource::Inline(json.into());
        self
    }

    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_notify_attendees(mut self, notify: bool) -> Self {
        self.notify_attendees = notify;
        self
    }

    /// Value of the `sendUpdates` parameter for event writes.
    pub fn send_updates(&self) -> &'static str {
        if self.notify_attendees { "all" } else { "none" }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref credentials) = self.credentials {
            credentials
                .validate()
                .map_err(|e| format!("invalid credentials: {}", e))?;
        }
        if self.calendar_id.trim().is_empty() {
            return Err("calendar_id must not be empty".to_string());
        }
        if let TokenSource::Inline(ref json) = self.tokens
            && json.trim().is_empty()
        {
            return Err("token_json must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::new()
    }
}
