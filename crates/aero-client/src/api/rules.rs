//! Rule download endpoint.

use crate::PanelClient;
use aero_core::{DownloadResponse, FetchError, ForwardingRule, RuleSet};
use serde::Deserialize;
use reqwest::StatusCode;
use tracing::debug;

/// Rule download endpoint (`action=DOWNLOAD_CONFIG`)
pub struct RulesApi<'a> {
    client: &'a PanelClient,
}

impl<'a> RulesApi<'a> {
    pub(crate) const fn new(client: &'a PanelClient) -> Self {
        Self { client }
    }

    /// Download the complete rule set for this node.
    ///
    /// Anything other than a 200 response carrying `success: true` and a
    /// decodable `rules` array is an error; no partial rule set is ever
    /// returned.
    pub async fn download(&self) -> Result<RuleSet, FetchError> {
        let timeout = self.client.timeout();
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Http(e.to_string())
            }
        };

        let response = self
            .client
            .agent_get(&[
                ("action", "DOWNLOAD_CONFIG"),
                ("node_id", self.client.node_id()),
                ("token", self.client.token()),
            ])
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        let parsed: DownloadResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::Decode(locate_bad_rule(&body).unwrap_or_else(|| e.to_string())))?;

        if !parsed.success {
            debug!(error = ?parsed.error, "panel refused download");
            return Err(FetchError::Rejected);
        }

        parsed.rules.ok_or(FetchError::MissingRules)
    }
}

/// Name the first rule that fails to decode, so the operator can find the row.
fn locate_bad_rule(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let rules = value.get("rules")?.as_array()?;

    rules.iter().enumerate().find_map(|(index, rule)| {
        ForwardingRule::deserialize(rule)
            .err()
            .map(|e| format!("rule #{index}: {e}"))
    })
}
