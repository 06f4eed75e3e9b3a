//! Control-plane abstraction used by the agent's scheduler.

use crate::PanelClient;
use aero_core::{FetchError, HeartbeatError, HeartbeatPayload, HeartbeatResponse, RuleSet};
use async_trait::async_trait;

/// The two calls an agent makes to its control plane.
///
/// Implementations perform no retries; a failed call is reported once and
/// the caller decides when to try again.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Download the node's complete rule set
    async fn fetch_rule_set(&self) -> Result<RuleSet, FetchError>;

    /// Report telemetry and receive scheduling instructions
    async fn send_heartbeat(
        &self,
        payload: &HeartbeatPayload,
    ) -> Result<HeartbeatResponse, HeartbeatError>;
}

#[async_trait]
impl ControlPlane for PanelClient {
    async fn fetch_rule_set(&self) -> Result<RuleSet, FetchError> {
        self.rules().download().await
    }

    async fn send_heartbeat(
        &self,
        payload: &HeartbeatPayload,
    ) -> Result<HeartbeatResponse, HeartbeatError> {
        self.heartbeat().send(payload).await
    }
}
