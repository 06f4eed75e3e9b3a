//! Agent configuration, read once at startup.

use serde::{de, Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for one agent process.
///
/// Built once in `main` and handed to the components that need it.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the control panel.
    pub panel_url: String,

    /// Node identifier issued by the panel (string or number in the file).
    #[serde(deserialize_with = "deserialize_node_id")]
    pub node_id: String,

    /// Node authentication token.
    pub token: String,

    /// Firewall-control binary (default: nft).
    #[serde(default = "default_nft_bin")]
    pub nft_bin: String,

    /// Where the compiled ruleset is written before loading (default: rules.nft).
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,

    /// Name of the managed nftables table (default: aeronode).
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Heartbeat interval until the panel says otherwise (seconds).
    #[serde(default = "default_interval")]
    pub default_interval_secs: u64,

    /// Longest time between resyncs regardless of panel signals (seconds).
    #[serde(default = "default_resync_ceiling")]
    pub resync_ceiling_secs: u64,

    /// Timeout for each panel request (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Longest a single ruleset load may run before it is killed (seconds).
    #[serde(default = "default_apply_timeout")]
    pub apply_timeout_secs: u64,

    /// Log file written alongside stdout (default: /var/log/aero-agent.log).
    /// An empty path disables it.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl AgentConfig {
    /// Load config from a file. `.toml` files are parsed as TOML, anything
    /// else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML config document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("panel_url", &self.panel_url),
            ("node_id", &self.node_id),
            ("token", &self.token),
            ("nft_bin", &self.nft_bin),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }

        // The table name is spliced into the ruleset verbatim.
        let table_ok = !self.table_name.is_empty()
            && self
                .table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !table_ok {
            return Err(ConfigError::Invalid(format!(
                "table_name {:?} must be non-empty and use only [A-Za-z0-9_-]",
                self.table_name
            )));
        }

        if self.default_interval_secs == 0 {
            return Err(ConfigError::Invalid("default_interval_secs must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.apply_timeout_secs == 0 {
            return Err(ConfigError::Invalid("apply_timeout_secs must be > 0".into()));
        }

        Ok(())
    }

    /// Heartbeat interval used until the panel sends one.
    pub const fn default_interval(&self) -> Duration {
        Duration::from_secs(self.default_interval_secs)
    }

    /// Resync safety-net ceiling.
    pub const fn resync_ceiling(&self) -> Duration {
        Duration::from_secs(self.resync_ceiling_secs)
    }

    /// Per-request timeout for panel calls.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Time limit for one `nft -f` run.
    pub const fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_secs)
    }

    /// Log file path, `None` when disabled.
    pub fn log_file(&self) -> Option<&Path> {
        (!self.log_file.as_os_str().is_empty()).then_some(self.log_file.as_path())
    }
}

// The panel issues numeric ids, so install scripts may write them unquoted.
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeIdRepr {
    Text(String),
    Number(u64),
}

fn deserialize_node_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match NodeIdRepr::deserialize(deserializer) {
        Ok(NodeIdRepr::Text(s)) => Ok(s.trim().to_string()),
        Ok(NodeIdRepr::Number(n)) => Ok(n.to_string()),
        Err(_) => Err(de::Error::custom("node_id must be a string or an integer")),
    }
}

// Default value functions for serde.
fn default_nft_bin() -> String {
    String::from("nft")
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("rules.nft")
}

fn default_table_name() -> String {
    String::from("aeronode")
}

const fn default_interval() -> u64 {
    30
}

const fn default_resync_ceiling() -> u64 {
    60
}

const fn default_request_timeout() -> u64 {
    15
}

const fn default_apply_timeout() -> u64 {
    30
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/aero-agent.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{"panel_url": "https://panel.example.com", "node_id": "1717", "token": "t0k"}"#;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.nft_bin, "nft");
        assert_eq!(config.rules_path, PathBuf::from("rules.nft"));
        assert_eq!(config.table_name, "aeronode");
        assert_eq!(config.default_interval(), Duration::from_secs(30));
        assert_eq!(config.resync_ceiling(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.apply_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_file(), Some(Path::new("/var/log/aero-agent.log")));
    }

    #[test]
    fn test_log_file_override_and_disable() {
        let config = AgentConfig::from_json(
            r#"{"panel_url": "http://p", "node_id": "1", "token": "t", "log_file": "/tmp/agent.log"}"#,
        )
        .unwrap();
        assert_eq!(config.log_file(), Some(Path::new("/tmp/agent.log")));

        let config = AgentConfig::from_json(
            r#"{"panel_url": "http://p", "node_id": "1", "token": "t", "log_file": ""}"#,
        )
        .unwrap();
        assert_eq!(config.log_file(), None);
    }

    #[test]
    fn test_numeric_node_id() {
        let config = AgentConfig::from_json(
            r#"{"panel_url": "http://p", "node_id": 1717171717171, "token": "t", "nft_bin": "/usr/sbin/nft"}"#,
        )
        .unwrap();
        assert_eq!(config.node_id, "1717171717171");
        assert_eq!(config.nft_bin, "/usr/sbin/nft");
    }

    #[test]
    fn test_missing_token_is_parse_error() {
        let err = AgentConfig::from_json(r#"{"panel_url": "http://p", "node_id": "1"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_values_rejected() {
        let err = AgentConfig::from_json(r#"{"panel_url": "http://p", "node_id": " ", "token": "t"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AgentConfig::from_json(
            r#"{"panel_url": "http://p", "node_id": "1", "token": "t", "table_name": "x; flush ruleset"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AgentConfig::from_json(
            r#"{"panel_url": "http://p", "node_id": "1", "token": "t", "default_interval_secs": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_toml_file() {
        let mut tmpfile = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            tmpfile,
            r#"
panel_url = "https://panel.example.com"
node_id = 42
token = "abc"
table_name = "edge_nat"
default_interval_secs = 10
"#
        )
        .unwrap();

        let config = AgentConfig::load(tmpfile.path()).unwrap();
        assert_eq!(config.node_id, "42");
        assert_eq!(config.table_name, "edge_nat");
        assert_eq!(config.default_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_json_file() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "{MINIMAL}").unwrap();

        let config = AgentConfig::load(tmpfile.path()).unwrap();
        assert_eq!(config.panel_url, "https://panel.example.com");
        assert_eq!(config.token, "t0k");
    }

    #[test]
    fn test_load_missing_file() {
        let err = AgentConfig::load(Path::new("/nonexistent/aero/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
