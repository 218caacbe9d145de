//! Environment variable helpers
//!
//! Configuration in stock-analyst is read once at startup from the process
//! environment. Empty values are treated the same as unset ones.

use std::str::FromStr;
use thiserror::Error;

/// Error raised when an environment variable holds an unparsable value
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid value for {key}: '{value}' ({reason})")]
pub struct EnvError {
    /// Variable name
    pub key: String,
    /// Raw value found in the environment
    pub value: String,
    /// Parser message
    pub reason: String,
}

/// Read a variable, returning `None` when unset or empty
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read a variable, falling back to `default` when unset or empty
pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Read and parse a variable, falling back to `default` when unset or empty
pub fn env_parse<T>(key: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| EnvError {
            key: key.to_string(),
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
