//! Secret references in config values.
//!
//! A value in `config.toml` may point at a secret stored elsewhere:
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`
//!
//! Anything else is taken literally.

use std::process::Command;

use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Expands a possibly-prefixed config value.
pub fn resolve(value: &str) -> ClientResult<String> {
    if let Some(path) = value.strip_prefix("pass::") {
        debug!("resolving secret from pass store entry {}", path);
        from_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        debug!("resolving secret from ${}", var);
        from_env(var)
    } else {
        Ok(value.to_string())
    }
}

/// Expands an optional value, keeping `None` as is.
pub fn resolve_opt(value: Option<&str>) -> ClientResult<Option<String>> {
    value.map(resolve).transpose()
}

fn from_pass(path: &str) -> ClientResult<String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| ClientError::Secret(format!("failed to run `pass show {}`: {}", path, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClientError::Secret(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ClientError::Secret(format!("`pass show {}` produced no output", path)))
}

fn from_env(var: &str) -> ClientResult<String> {
    std::env::var(var)
        .map_err(|_| ClientError::Secret(format!("environment variable `{}` is not set", var)))
}
