//! Main panel client implementation.

use crate::api::{HeartbeatApi, RulesApi};
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Path of the agent endpoint on the panel
const AGENT_PATH: &str = "/agent";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Identifying User-Agent expected by the panel
pub const DEFAULT_USER_AGENT: &str = "AeroAgent/8.0";

/// Errors raised while building a [`PanelClient`]
#[derive(Error, Debug)]
pub enum ClientError {
    /// Panel URL could not be parsed
    #[error("invalid panel URL {url:?}: {reason}")]
    InvalidUrl {
        /// URL as configured
        url: String,
        /// Parser message
        reason: String,
    },

    /// Underlying HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Client for the panel's agent endpoint
#[derive(Clone)]
pub struct PanelClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    base_url: String,
    node_id: String,
    token: String,
    timeout: Duration,
}

impl PanelClient {
    /// Create a builder for a node's credentials
    #[must_use]
    pub fn builder(
        panel_url: impl Into<String>,
        node_id: impl Into<String>,
        token: impl Into<String>,
    ) -> PanelClientBuilder {
        PanelClientBuilder::new(panel_url, node_id, token)
    }

    /// Access the rule download endpoint
    #[must_use]
    pub fn rules(&self) -> RulesApi<'_> {
        RulesApi::new(self)
    }

    /// Access the heartbeat endpoint
    #[must_use]
    pub fn heartbeat(&self) -> HeartbeatApi<'_> {
        HeartbeatApi::new(self)
    }

    /// Node identifier this client reports as
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }

    /// Node authentication token
    #[must_use]
    pub fn token(&self) -> &str {
        &self.inner.token
    }

    /// Configured request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Perform a GET against the agent endpoint with the given query
    pub(crate) async fn agent_get(
        &self,
        params: &[(&str, &str)],
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let url = self.build_url(params);
        debug!(action = params.first().map_or("", |(_, v)| *v), "GET request");

        self.inner.http.get(&url).send().await
    }

    /// Build the agent URL with form-encoded query parameters
    fn build_url(&self, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.inner.base_url, AGENT_PATH);

        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        url
    }
}

impl std::fmt::Debug for PanelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelClient")
            .field("base_url", &self.inner.base_url)
            .field("node_id", &self.inner.node_id)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`PanelClient`]
pub struct PanelClientBuilder {
    panel_url: String,
    node_id: String,
    token: String,
    timeout: Duration,
    user_agent: String,
}

impl PanelClientBuilder {
    /// Create a new builder with the given panel URL and node credentials
    #[must_use]
    pub fn new(
        panel_url: impl Into<String>,
        node_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            panel_url: panel_url.into(),
            node_id: node_id.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<PanelClient, ClientError> {
        let trimmed = self.panel_url.trim().trim_end_matches('/');
        url::Url::parse(trimmed).map_err(|e| ClientError::InvalidUrl {
            url: self.panel_url.clone(),
            reason: e.to_string(),
        })?;

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(PanelClient {
            inner: Arc::new(ClientInner {
                http,
                base_url: trimmed.to_string(),
                node_id: self.node_id,
                token: self.token,
                timeout: self.timeout,
            }),
        })
    }
}

// URL encoding helper
mod urlencoding {
    pub fn encode(s: &str) -> String {
        url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
    }
}
