//! Tracing setup for reshuffle
//!
//! Diagnostics go to stderr; the run transcript printed on stdout is a
//! separate value and is never routed through here.
//!
//! # Usage
//!
//! ```ignore
//! use reshuffle_core::tracing::{init_tracing, TracingConfig, TracingOutputFormat};
//!
//! let config = TracingConfig::default().with_format(TracingOutputFormat::Json);
//! init_tracing(config)?;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::Layered, prelude::*, registry::LookupSpan,
};

type Filtered = Layered<EnvFilter, Registry>;

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for diagnostics, selected by `log_format` in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingOutputFormat {
    /// One line per event
    #[default]
    Compact,
    /// Multi-line, for reading a debug session
    Pretty,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level used when neither `RUST_LOG` nor `env_filter` is set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Source file and line of each event
    pub include_location: bool,
    /// Module path of each event
    pub include_target: bool,
    /// Ignored by the JSON format, which always carries a timestamp
    pub include_timestamp: bool,
    /// Overrides both `RUST_LOG` and `default_level`
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Preset for `--debug` runs.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            include_timestamp: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref filter) = self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("reshuffle={}", self.default_level))))
    }

    /// Builds the stderr formatting layer for the configured format.
    fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + 'static,
    {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(self.include_target);

        match (self.output_format, self.include_timestamp) {
            (TracingOutputFormat::Json, _) => base.json().boxed(),
            (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
            (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().boxed(),
            (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set or the env filter
/// directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.build_filter()?)
        .with(config.layer::<Filtered>());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(!config.include_location);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn test_cli_debug_keeps_format() {
        let config = TracingConfig::cli_debug().with_format(TracingOutputFormat::Pretty);
        assert_eq!(config.default_level, Level::DEBUG);
        assert_eq!(config.output_format, TracingOutputFormat::Pretty);
        assert!(config.include_location);
        assert!(!config.include_timestamp);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = TracingConfig::default().with_env_filter("reshuffle=notalevel");
        assert!(config.build_filter().is_err());
    }

    #[test]
    fn test_format_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: TracingOutputFormat,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(parsed.format, TracingOutputFormat::Json);
        assert!(serde_json::from_str::<Wrapper>(r#"{"format":"xml"}"#).is_err());
    }

    #[test]
    fn test_every_format_builds_a_working_layer() {
        for format in [
            TracingOutputFormat::Compact,
            TracingOutputFormat::Pretty,
            TracingOutputFormat::Json,
        ] {
            for config in [TracingConfig::default(), TracingConfig::cli_debug()] {
                let config = config.with_format(format).with_env_filter("reshuffle_core=debug");
                let subscriber = tracing_subscriber::registry()
                    .with(config.build_filter().unwrap())
                    .with(config.layer::<Filtered>());
                tracing::subscriber::with_default(subscriber, || {
                    tracing::debug!(?format, "layer smoke event");
                });
            }
        }
    }
}
