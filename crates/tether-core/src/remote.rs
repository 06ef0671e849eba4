//! Normalized remote responses and the records parsed out of them
//!
//! Transport implementations never return errors for remote calls; every
//! call yields a [`RemoteResponse`] and callers branch on its
//! [`RemoteOutcome`]. Status `0` stands for "no HTTP response at all".

use crate::{Result, TetherError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Uniform result shape of one remote call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    /// HTTP status, or `0` when no response was received
    pub status: u16,
    /// Parsed JSON body (`{}` when empty, `{"raw": ..}` when not JSON)
    pub body: Value,
    /// Whether the status was a 2xx and the body parsed
    pub ok: bool,
}

/// Classification the state machines branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// 2xx with a usable body
    Success,
    /// 404: expected in several states, often a success
    NotFound,
    /// No response (connect error, TLS, timeout)
    TransportFailure,
    /// Any other status
    Rejected,
}

impl RemoteResponse {
    /// A successful response
    pub fn success(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            ok: true,
        }
    }

    /// A response with a non-success status
    pub fn failure(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            ok: false,
        }
    }

    /// A call that never produced an HTTP response
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::failure(0, json!({ "error": message.into() }))
    }

    /// Classify the response
    pub fn outcome(&self) -> RemoteOutcome {
        match (self.ok, self.status) {
            (true, _) => RemoteOutcome::Success,
            (false, 0) => RemoteOutcome::TransportFailure,
            (false, 404) => RemoteOutcome::NotFound,
            (false, _) => RemoteOutcome::Rejected,
        }
    }

    /// Short human-readable rendering used in step messages
    pub fn describe(&self) -> String {
        match self.outcome() {
            RemoteOutcome::TransportFailure => {
                let reason = self
                    .body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("no response");
                format!("transport failure: {reason}")
            }
            _ => format!("({}): {}", self.status, compact(&self.body)),
        }
    }

    /// Convert a non-success response into the error taxonomy
    pub fn to_error(&self) -> TetherError {
        match self.outcome() {
            RemoteOutcome::TransportFailure => TetherError::transport(self.describe()),
            RemoteOutcome::NotFound => TetherError::not_found(compact(&self.body)),
            RemoteOutcome::Success | RemoteOutcome::Rejected => {
                TetherError::rejected(self.status, compact(&self.body))
            }
        }
    }
}

fn compact(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Identifiers block of a registry record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIds {
    /// Registry identifier
    #[serde(default)]
    pub gateway_id: Option<String>,
    /// Hardware EUI as reported by the registry
    #[serde(default)]
    pub eui: Option<String>,
}

/// Antenna entry of a registry record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteAntenna {
    /// Reported location, if any
    #[serde(default)]
    pub location: Option<Value>,
}

/// The identity registry's view of a gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Identifiers
    #[serde(default)]
    pub ids: RemoteIds,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Which radio-plane server the gateway should connect to
    #[serde(default, rename = "gateway_server_address")]
    pub server_pointer: Option<String>,
    /// Frequency plans
    #[serde(default)]
    pub frequency_plan_ids: Vec<String>,
    /// Antennas
    #[serde(default)]
    pub antennas: Vec<RemoteAntenna>,
    /// Duty-cycle enforcement
    #[serde(default)]
    pub enforce_duty_cycle: Option<bool>,
    /// Authenticated-connection enforcement
    #[serde(default)]
    pub require_authenticated_connection: Option<bool>,
}

impl RemoteRecord {
    /// Parse a record from a registry response body
    pub fn from_body(body: &Value) -> Result<Self> {
        Ok(serde_json::from_value(body.clone())?)
    }
}

/// Live session details reported by the radio-plane server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// When the current session started
    #[serde(default)]
    pub connected_at: Option<String>,
    /// Last uplink seen on the session
    #[serde(default)]
    pub last_uplink_received_at: Option<String>,
    /// Connection protocol (`ws`, `udp`, ...)
    #[serde(default)]
    pub protocol: Option<String>,
}

impl ConnectionState {
    /// Parse connection stats from a radio-plane response body
    pub fn from_body(body: &Value) -> Result<Self> {
        Ok(serde_json::from_value(body.clone())?)
    }
}

/// Radio-plane view of a gateway's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioConnection {
    /// A live session exists
    Connected(ConnectionState),
    /// No session; the hardware may simply not be installed yet
    NotConnected,
}

/// An issued API key as listed by the registry (never carries the secret)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeySummary {
    /// Key identifier
    #[serde(default)]
    pub id: String,
    /// Label
    #[serde(default)]
    pub name: Option<String>,
    /// Granted rights
    #[serde(default)]
    pub rights: Vec<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct ApiKeyList {
    #[serde(default)]
    api_keys: Vec<ApiKeySummary>,
}

impl ApiKeySummary {
    /// Parse the `{"api_keys": [...]}` listing body
    pub fn list_from_body(body: &Value) -> Result<Vec<Self>> {
        let list: ApiKeyList = serde_json::from_value(body.clone())?;
        Ok(list.api_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(
            RemoteResponse::success(200, json!({})).outcome(),
            RemoteOutcome::Success
        );
        assert_eq!(
            RemoteResponse::failure(404, json!({})).outcome(),
            RemoteOutcome::NotFound
        );
        assert_eq!(
            RemoteResponse::transport_error("timed out").outcome(),
            RemoteOutcome::TransportFailure
        );
        assert_eq!(
            RemoteResponse::failure(403, json!({"message": "no rights"})).outcome(),
            RemoteOutcome::Rejected
        );
    }

    #[test]
    fn test_to_error_maps_taxonomy() {
        assert!(matches!(
            RemoteResponse::transport_error("dns").to_error(),
            TetherError::TransportFailure { .. }
        ));
        assert!(matches!(
            RemoteResponse::failure(409, json!({"code": 6})).to_error(),
            TetherError::RemoteRejection { status: 409, .. }
        ));
    }

    #[test]
    fn test_record_parses_pointer() {
        let body = json!({
            "ids": {"gateway_id": "gw-a00009ef", "eui": "00800000A00009EF"},
            "name": "Cooler",
            "gateway_server_address": "eu1.cloud.thethings.network",
            "frequency_plan_ids": ["US_902_928_FSB_2"]
        });
        let record = RemoteRecord::from_body(&body).unwrap();
        assert_eq!(
            record.server_pointer.as_deref(),
            Some("eu1.cloud.thethings.network")
        );
        assert_eq!(record.ids.gateway_id.as_deref(), Some("gw-a00009ef"));
    }

    #[test]
    fn test_record_without_pointer() {
        let record = RemoteRecord::from_body(&json!({"ids": {"gateway_id": "gw-1"}})).unwrap();
        assert!(record.server_pointer.is_none());
    }

    #[test]
    fn test_api_key_listing() {
        let body = json!({"api_keys": [{"id": "K1", "name": "LNS", "rights": ["RIGHT_GATEWAY_LINK"]}]});
        let keys = ApiKeySummary::list_from_body(&body).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].rights, vec!["RIGHT_GATEWAY_LINK".to_string()]);
        assert!(ApiKeySummary::list_from_body(&json!({})).unwrap().is_empty());
    }
}
