//! Loads compiled rulesets into the kernel through the firewall-control binary.

use aero_core::ApplyError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::compiler::ConfigDocument;

/// Applies a compiled document as the active firewall configuration.
#[async_trait]
pub trait RuleApplier: Send + Sync {
    /// Replace the active table with `document`. On error the previously
    /// active table stays in place.
    async fn apply(&self, document: &ConfigDocument) -> Result<(), ApplyError>;
}

/// Longest a single `nft -f` run may take before it is killed.
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Writes the document to a rules file and runs `<binary> -f <file>`.
#[derive(Debug, Clone)]
pub struct NftApplier {
    binary: String,
    rules_path: PathBuf,
    timeout: Duration,
}

impl NftApplier {
    /// Create an applier using `binary` and the rules file at `rules_path`
    pub fn new(binary: impl Into<String>, rules_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            rules_path: rules_path.into(),
            timeout: DEFAULT_APPLY_TIMEOUT,
        }
    }

    /// Kill the binary if it runs longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rules file written before each load
    #[must_use]
    pub fn rules_path(&self) -> &Path {
        &self.rules_path
    }
}

#[async_trait]
impl RuleApplier for NftApplier {
    async fn apply(&self, document: &ConfigDocument) -> Result<(), ApplyError> {
        tokio::fs::write(&self.rules_path, document.as_str())
            .await
            .map_err(|source| ApplyError::Write {
                path: self.rules_path.display().to_string(),
                source,
            })?;

        debug!(binary = %self.binary, path = %self.rules_path.display(), "loading ruleset");
        let run = Command::new(&self.binary)
            .arg("-f")
            .arg(&self.rules_path)
            .kill_on_drop(true)
            .output();

        // Dropping the timed-out future kills the child.
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| ApplyError::TimedOut {
                binary: self.binary.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    ApplyError::BinaryMissing {
                        binary: self.binary.clone(),
                    }
                } else {
                    ApplyError::Spawn {
                        binary: self.binary.clone(),
                        source,
                    }
                }
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ApplyError::Rejected {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
