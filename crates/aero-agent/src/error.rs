//! Error types for the aero agent.

use aero_core::{ApplyError, FetchError};
use thiserror::Error;

/// Errors loading the agent configuration. These are the only fatal errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON/TOML for the expected schema
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Config parsed but a value is unusable
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure of one resync attempt (fetch, then apply).
#[derive(Error, Debug)]
pub enum SyncError {
    /// Rule set could not be downloaded; active rules untouched
    #[error("rule download failed: {0}")]
    Fetch(#[from] FetchError),

    /// Compiled ruleset could not be loaded; active rules untouched
    #[error("rule apply failed: {0}")]
    Apply(#[from] ApplyError),
}
