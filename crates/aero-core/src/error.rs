use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while downloading the rule set from the panel
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Panel answered with something other than 200
    #[error("download failed: HTTP {code}")]
    Status {
        /// HTTP status code
        code: u16,
    },

    /// Response body was not the expected JSON document
    #[error("invalid rule set response: {0}")]
    Decode(String),

    /// Panel answered `success: false`
    #[error("panel rejected the download request")]
    Rejected,

    /// Panel answered `success: true` without a `rules` field
    #[error("panel response carried no rules")]
    MissingRules,
}

impl FetchError {
    /// Returns true if the error came from the transport rather than the panel
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout(_))
    }
}

/// Errors that can occur while submitting a heartbeat
#[derive(Error, Debug)]
pub enum HeartbeatError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Panel answered with something other than 200
    #[error("heartbeat rejected: HTTP {code}")]
    Status {
        /// HTTP status code
        code: u16,
    },

    /// Payload could not be serialized
    #[error("failed to encode heartbeat payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Response body was not valid JSON
    #[error("invalid heartbeat response: {0}")]
    Decode(String),
}

impl HeartbeatError {
    /// Returns true if the error came from the transport rather than the panel
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout(_))
    }
}

/// Errors that can occur while loading a compiled ruleset into the firewall
#[derive(Error, Debug)]
pub enum ApplyError {
    /// Firewall-control binary does not exist
    #[error("firewall binary not found: {binary}")]
    BinaryMissing {
        /// Binary that was looked up
        binary: String,
    },

    /// Rules file could not be written
    #[error("failed to write rules file {path}: {source}")]
    Write {
        /// Target path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Binary exists but could not be started
    #[error("failed to run {binary}: {source}")]
    Spawn {
        /// Binary that failed to start
        binary: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Binary did not finish in time and was killed
    #[error("{binary} did not finish within {timeout:?}")]
    TimedOut {
        /// Binary that was killed
        binary: String,
        /// Limit that was exceeded
        timeout: Duration,
    },

    /// Binary ran and rejected the ruleset
    #[error("ruleset rejected (exit code {code:?}): {stderr}")]
    Rejected {
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Diagnostic output of the binary, uninterpreted
        stderr: String,
    },
}

/// Errors reading system telemetry.
///
/// These never leave the stats collector; each one is replaced by a
/// default value in the reported stats.
#[derive(Error, Debug)]
pub enum TelemetryReadError {
    /// Load average unreadable
    #[error("load average unavailable: {0}")]
    LoadAverage(String),

    /// Memory info unreadable
    #[error("memory info unavailable: {0}")]
    Memory(String),

    /// Network device counters unreadable
    #[error("network counters unavailable: {0}")]
    Network(String),
}
