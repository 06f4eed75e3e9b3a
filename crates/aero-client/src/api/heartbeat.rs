//! Heartbeat endpoint.

use crate::PanelClient;
use aero_core::{HeartbeatError, HeartbeatPayload, HeartbeatResponse};
use base64::Engine;
use reqwest::StatusCode;

/// Heartbeat endpoint (`action=HEARTBEAT`)
pub struct HeartbeatApi<'a> {
    client: &'a PanelClient,
}

impl<'a> HeartbeatApi<'a> {
    pub(crate) const fn new(client: &'a PanelClient) -> Self {
        Self { client }
    }

    /// Submit a heartbeat and return the panel's scheduling instructions
    pub async fn send(&self, payload: &HeartbeatPayload) -> Result<HeartbeatResponse, HeartbeatError> {
        let timeout = self.client.timeout();
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                HeartbeatError::Timeout(timeout)
            } else {
                HeartbeatError::Http(e.to_string())
            }
        };

        let data = encode_payload(payload)?;
        let response = self
            .client
            .agent_get(&[("action", "HEARTBEAT"), ("data", data.as_str())])
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(HeartbeatError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        serde_json::from_str(&body).map_err(|e| HeartbeatError::Decode(e.to_string()))
    }
}

/// Encode a heartbeat for the `data` query parameter: JSON, then standard
/// padded base64. URL-encoding happens when the query string is built.
pub fn encode_payload(payload: &HeartbeatPayload) -> Result<String, HeartbeatError> {
    let json = serde_json::to_vec(payload)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_core::SystemStats;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PanelClient {
        PanelClient::builder(server.uri(), "42", "tok")
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap()
    }

    fn payload() -> HeartbeatPayload {
        HeartbeatPayload {
            node_id: "42".into(),
            token: "tok".into(),
            stats: SystemStats {
                load_average: 1.25,
                memory_usage: 63,
                rx_rate: 2048,
                tx_rate: 10,
                rx_total: 0,
                tx_total: 0,
                workers: 1,
            },
        }
    }

    #[test]
    fn test_encode_payload_is_base64_json() {
        let encoded = encode_payload(&payload()).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(&encoded).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["nodeId"], "42");
        assert_eq!(value["token"], "tok");
        assert_eq!(value["stats"]["cpu_load"], "1.25");
        assert_eq!(value["stats"]["rx_speed"], "2.0 KB/s");
    }

    #[tokio::test]
    async fn test_heartbeat_wire_encoding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agent"))
            .and(query_param("action", "HEARTBEAT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "interval": 3,
                "has_cmd": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server).heartbeat().send(&payload()).await.unwrap();
        assert_eq!(resp.interval, Some(3));
        assert_eq!(resp.has_cmd, Some(true));

        let requests = server.received_requests().await.unwrap();
        let (_, data) = requests[0]
            .url
            .query_pairs()
            .find(|(k, _)| k == "data")
            .unwrap();
        assert_eq!(data, encode_payload(&payload()).unwrap());

        // Reserved base64 characters never reach the wire unescaped.
        let raw_query = requests[0].url.query().unwrap();
        let raw_data = raw_query.split("data=").nth(1).unwrap();
        assert!(!raw_data.contains('+'));
        assert!(!raw_data.contains('='));
    }

    #[tokio::test]
    async fn test_heartbeat_missing_fields_are_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let resp = client_for(&server).heartbeat().send(&payload()).await.unwrap();
        assert_eq!(resp, HeartbeatResponse::default());
    }

    #[tokio::test]
    async fn test_heartbeat_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Auth failed"})))
            .mount(&server)
            .await;

        let err = client_for(&server).heartbeat().send(&payload()).await.unwrap_err();
        assert!(matches!(err, HeartbeatError::Status { code: 401 }));
    }

    #[tokio::test]
    async fn test_heartbeat_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let err = client_for(&server).heartbeat().send(&payload()).await.unwrap_err();
        assert!(matches!(err, HeartbeatError::Decode(_)));
    }

    #[tokio::test]
    async fn test_heartbeat_unreachable_panel() {
        let client = PanelClient::builder("http://127.0.0.1:9", "42", "tok")
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();

        let err = client.heartbeat().send(&payload()).await.unwrap_err();
        assert!(err.is_transport(), "got {err:?}");
    }
}
