//! Read-only status report across both clusters

use std::sync::Arc;
use tether_core::{
    ApiKeySummary, ConnectionState, DeviceId, GatewayEffects, RemoteOutcome, RemoteRecord,
    Topology,
};

/// Registry view of the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// The record exists
    Registered(RemoteRecord),
    /// The registry has no record
    NotFound,
    /// The registry could not be read
    Unavailable(String),
}

/// Cross-check of the record's server pointer against the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerCheck {
    /// Points at the radio-plane host
    Correct,
    /// Points elsewhere or nowhere
    Drifted {
        /// Host the topology expects
        expected: String,
        /// Host the record carries
        observed: Option<String>,
    },
    /// No record to check
    Unknown,
}

/// Radio-plane view of the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connectivity {
    /// A live session exists
    Connected(ConnectionState),
    /// No session
    NotConnected,
    /// The radio plane could not be queried
    Unavailable(String),
}

/// Keys issued for the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialListing {
    /// Keys as listed by the registry
    Listed(Vec<ApiKeySummary>),
    /// The listing could not be read
    Unavailable(String),
}

/// Structured status of one gateway
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Target device
    pub device_id: DeviceId,
    /// Topology the report was checked against
    pub topology: Topology,
    /// Registry record
    pub registration: Registration,
    /// Pointer cross-check
    pub pointer: PointerCheck,
    /// Radio-plane session, queried only for registered gateways
    pub connectivity: Option<Connectivity>,
    /// Issued keys, queried only for registered gateways
    pub credentials: Option<CredentialListing>,
}

impl StatusReport {
    /// Whether the pointer disagrees with the topology
    pub fn has_drift(&self) -> bool {
        matches!(self.pointer, PointerCheck::Drifted { .. })
    }

    /// Whether the registry holds a record
    pub fn is_registered(&self) -> bool {
        matches!(self.registration, Registration::Registered(_))
    }
}

/// Builds status reports; never mutates remote state
pub struct StatusReporter<E: GatewayEffects> {
    effects: Arc<E>,
    topology: Topology,
}

impl<E: GatewayEffects> StatusReporter<E> {
    /// Reporter for a fixed topology
    pub fn new(effects: Arc<E>, topology: Topology) -> Self {
        Self { effects, topology }
    }

    /// Query both clusters for one gateway
    pub async fn report(&self, device_id: &DeviceId) -> StatusReport {
        let response = self.effects.get_gateway(device_id).await;
        let registration = match response.outcome() {
            RemoteOutcome::Success => match RemoteRecord::from_body(&response.body) {
                Ok(record) => Registration::Registered(record),
                Err(e) => Registration::Unavailable(e.to_string()),
            },
            RemoteOutcome::NotFound => Registration::NotFound,
            RemoteOutcome::TransportFailure | RemoteOutcome::Rejected => {
                Registration::Unavailable(response.describe())
            }
        };

        let Registration::Registered(record) = &registration else {
            tracing::info!(device_id = %device_id, ?registration, "gateway not registered");
            return StatusReport {
                device_id: device_id.clone(),
                topology: self.topology.clone(),
                registration,
                pointer: PointerCheck::Unknown,
                connectivity: None,
                credentials: None,
            };
        };

        let pointer = if self.topology.pointer_matches(record.server_pointer.as_deref()) {
            PointerCheck::Correct
        } else {
            tracing::warn!(
                device_id = %device_id,
                observed = ?record.server_pointer,
                "server pointer drifted"
            );
            PointerCheck::Drifted {
                expected: self.topology.radio_plane_host.clone(),
                observed: record.server_pointer.clone(),
            }
        };

        let response = self.effects.connection_stats(device_id).await;
        let connectivity = match response.outcome() {
            RemoteOutcome::Success => Connectivity::Connected(
                ConnectionState::from_body(&response.body).unwrap_or_default(),
            ),
            RemoteOutcome::NotFound => Connectivity::NotConnected,
            RemoteOutcome::TransportFailure | RemoteOutcome::Rejected => {
                Connectivity::Unavailable(response.describe())
            }
        };

        let response = self.effects.list_api_keys(device_id).await;
        let credentials = if response.ok {
            match ApiKeySummary::list_from_body(&response.body) {
                Ok(keys) => CredentialListing::Listed(keys),
                Err(e) => CredentialListing::Unavailable(e.to_string()),
            }
        } else {
            CredentialListing::Unavailable(response.describe())
        };

        StatusReport {
            device_id: device_id.clone(),
            topology: self.topology.clone(),
            registration,
            pointer,
            connectivity: Some(connectivity),
            credentials: Some(credentials),
        }
    }
}
