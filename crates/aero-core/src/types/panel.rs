use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{RuleSet, SystemStats};

/// Body of a `DOWNLOAD_CONFIG` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadResponse {
    /// Whether the panel accepted the request
    #[serde(default)]
    pub success: bool,

    /// Complete rule set for this node
    #[serde(default)]
    pub rules: Option<RuleSet>,

    /// Error message, present on failures
    #[serde(default)]
    pub error: Option<String>,
}

/// Heartbeat report sent to the panel
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatPayload {
    /// Node identifier issued by the panel
    #[serde(rename = "nodeId")]
    pub node_id: String,

    /// Node authentication token
    pub token: String,

    /// Telemetry sample
    pub stats: SystemStats,
}

/// Panel's answer to a heartbeat.
///
/// A missing field means "keep the previous value".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct HeartbeatResponse {
    /// Seconds until the next heartbeat
    #[serde(default)]
    pub interval: Option<u64>,

    /// Set when the panel holds a rule update for this node
    #[serde(default)]
    pub has_cmd: Option<bool>,
}

impl HeartbeatResponse {
    /// Interval requested by the panel, if any. Zero counts as absent.
    #[must_use]
    pub fn requested_interval(&self) -> Option<Duration> {
        self.interval.filter(|&secs| secs > 0).map(Duration::from_secs)
    }

    /// Returns true if the panel asked for a resync
    #[must_use]
    pub fn wants_resync(&self) -> bool {
        self.has_cmd.unwrap_or(false)
    }
}
