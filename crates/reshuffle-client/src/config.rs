//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/reshuffle/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`, `token_json`) support
//! secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};

use reshuffle_core::{TracingConfig, TracingOutputFormat};
use reshuffle_engine::{ScheduleSettings, parse_time};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the reshuffle client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    /// Slot grid, blackout and owner settings.
    pub schedule: ScheduleConfig,

    /// Debug mode.
    pub debug: bool,

    /// Diagnostics format on stderr: `compact`, `pretty` or `json`.
    pub log_format: TracingOutputFormat,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it is absent.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parses TOML content.
    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content).map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reshuffle")
    }

    /// Calendar to operate on.
    pub fn calendar_id(&self) -> String {
        #[cfg(feature = "google")]
        if let Some(id) = self.google.as_ref().and_then(|g| g.calendar_id.clone()) {
            return id;
        }
        "primary".to_string()
    }

    /// Diagnostics setup; `debug` comes from the CLI flag or the config.
    pub fn tracing_config(&self, debug: bool) -> TracingConfig {
        let base = if debug || self.debug {
            TracingConfig::cli_debug()
        } else {
            TracingConfig::default()
        };
        base.with_format(self.log_format)
    }

    /// Checks every section without touching the network.
    pub fn validate(&self) -> ClientResult<()> {
        self.schedule.to_settings()?;
        #[cfg(feature = "google")]
        if let Some(ref google) = self.google {
            google.to_provider_config()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScheduleConfig ([schedule])
// ---------------------------------------------------------------------------

/// Slot search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minutes between candidate slot starts.
    pub step_minutes: u32,

    /// Daily blackout start, `HH:MM`.
    pub blackout_start: String,

    /// Daily blackout end, `HH:MM`. Equal to the start to disable the blackout.
    pub blackout_end: String,

    /// Owner identity; defaults to the calendar's own id.
    pub organizer: Option<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            step_minutes: 15,
            blackout_start: "12:00".to_string(),
            blackout_end: "13:00".to_string(),
            organizer: None,
        }
    }
}

impl ScheduleConfig {
    /// Converts to engine settings, validating times and bounds.
    pub fn to_settings(&self) -> ClientResult<ScheduleSettings> {
        let start = parse_time(&self.blackout_start)
            .map_err(|e| ClientError::Config(format!("schedule.blackout_start: {}", e)))?;
        let end = parse_time(&self.blackout_end)
            .map_err(|e| ClientError::Config(format!("schedule.blackout_end: {}", e)))?;
        let settings = ScheduleSettings::default()
            .with_step_minutes(self.step_minutes)
            .with_blackout(start, end);
        settings
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings ([google])
// ---------------------------------------------------------------------------

/// Google Calendar provider settings.
///
/// Client credentials are optional when the token file embeds them.
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Calendar to operate on; `primary` when unset.
    pub calendar_id: Option<String>,

    /// Path to the token file.
    pub token_path: Option<PathBuf>,

    /// Token JSON given inline (supports `pass::` and `env::` prefixes).
    /// Takes precedence over `token_path`.
    pub token_json: Option<String>,

    /// Email attendees when a meeting moves.
    pub notify_attendees: bool,

    /// HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,
}

#[cfg(feature = "google")]
impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            calendar_id: None,
            token_path: None,
            token_json: None,
            notify_attendees: true,
            timeout_secs: None,
        }
    }
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to provider configuration, expanding secret references.
    pub fn to_provider_config(&self) -> ClientResult<reshuffle_providers::google::GoogleConfig> {
        use reshuffle_providers::google::GoogleConfig;

        let mut config = GoogleConfig::new().with_notify_attendees(self.notify_attendees);

        if let Some(credentials) = self.resolve_credentials()? {
            config = config.with_credentials(credentials);
        }
        if let Some(ref id) = self.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(json) = crate::secret::resolve_opt(self.token_json.as_deref())? {
            config = config.with_token_json(json);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(std::time::Duration::from_secs(secs));
        }

        config.validate().map_err(ClientError::Config)?;
        Ok(config)
    }

    /// Resolves the OAuth client credentials, if configured.
    ///
    /// Either both `client_id` and `client_secret` are set, or neither.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<Option<reshuffle_providers::google::OAuthCredentials>> {
        use reshuffle_providers::google::OAuthCredentials;

        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (None, None) => Ok(None),
            (Some(id), Some(secret)) => {
                let credentials = OAuthCredentials::new(
                    crate::secret::resolve(id)?,
                    crate::secret::resolve(secret)?,
                );
                credentials
                    .validate()
                    .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;
                Ok(Some(credentials))
            }
            (Some(_), None) => Err(ClientError::Config(
                "client_secret is missing from [google] section in config.toml".to_string(),
            )),
            (None, Some(_)) => Err(ClientError::Config(
                "client_id is missing from [google] section in config.toml".to_string(),
            )),
        }
    }
}
