//! User-facing run transcript.
//!
//! Every run produces a newline-joined list of `LEVEL: message` lines. Each
//! line is mirrored to `tracing` at the matching level.

use std::fmt;

use tracing::{debug, error, info, warn};

/// Transcript line severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Accumulated run log.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<(Level, String)>,
    verbose: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript that also keeps debug lines.
    pub fn verbose() -> Self {
        Self {
            lines: Vec::new(),
            verbose: true,
        }
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        if self.verbose {
            self.lines.push((Level::Debug, message));
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.lines.push((Level::Info, message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.lines.push((Level::Warning, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.lines.push((Level::Error, message));
    }

    /// Recorded lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = (Level, &str)> {
        self.lines.iter().map(|(level, msg)| (*level, msg.as_str()))
    }

    /// Returns true if any error line was recorded.
    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|(level, _)| *level == Level::Error)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Joins all lines with `\n`.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (level, message)) in self.lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", level.as_str(), message)?;
        }
        Ok(())
    }
}
