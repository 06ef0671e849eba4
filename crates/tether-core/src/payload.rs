//! Request payloads sent to the identity registry
//!
//! Registration carries the full desired state, server pointer included, in a
//! single call. Every later change is a [`GatewayPatch`] whose field mask names
//! exactly the fields it touches.

use crate::desired::{AntennaLocation, DesiredState};
use crate::topology::Topology;
use serde::Serialize;
use serde_json::{json, Value};

/// Registry field holding the server pointer
pub const FIELD_SERVER_POINTER: &str = "gateway_server_address";
/// Registry field holding the antenna list
pub const FIELD_ANTENNAS: &str = "antennas";

/// Identifier block of a registration payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayIds {
    /// Registry identifier
    pub gateway_id: String,
    /// Hardware EUI, upper-case hex
    pub eui: String,
}

/// Full payload used to create a gateway under its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayRegistration {
    /// Identifiers
    pub ids: GatewayIds,
    /// Display name
    pub name: String,
    /// Frequency plans
    pub frequency_plan_ids: Vec<String>,
    /// Server pointer, always the topology's radio-plane host
    pub gateway_server_address: String,
    /// Duty-cycle enforcement
    pub enforce_duty_cycle: bool,
    /// Authenticated-connection enforcement
    pub require_authenticated_connection: bool,
    /// Status visibility
    pub status_public: bool,
    /// Location visibility
    pub location_public: bool,
}

impl GatewayRegistration {
    /// Build the registration payload for a desired state
    pub fn from_desired(desired: &DesiredState, topology: &Topology) -> Self {
        Self {
            ids: GatewayIds {
                gateway_id: desired.identity.device_id.to_string(),
                eui: desired.identity.eui.to_string(),
            },
            name: desired.display_name.clone(),
            frequency_plan_ids: vec![desired.frequency_plan.clone()],
            gateway_server_address: topology.radio_plane_host.clone(),
            enforce_duty_cycle: desired.flags.enforce_duty_cycle,
            require_authenticated_connection: desired.flags.require_authenticated_connection,
            status_public: desired.flags.status_public,
            location_public: desired.flags.location_public,
        }
    }
}

/// A field-mask partial update
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayPatch {
    /// Repoint the record at a radio-plane host
    ServerPointer(String),
    /// Replace the antenna list
    Antennas(Vec<AntennaLocation>),
}

impl GatewayPatch {
    /// Fields named in the update's mask
    pub fn field_mask(&self) -> Vec<&'static str> {
        match self {
            Self::ServerPointer(_) => vec![FIELD_SERVER_POINTER],
            Self::Antennas(_) => vec![FIELD_ANTENNAS],
        }
    }

    /// Gateway fields carried by the update; contains only masked fields
    pub fn gateway_fields(&self) -> Value {
        match self {
            Self::ServerPointer(host) => json!({ FIELD_SERVER_POINTER: host }),
            Self::Antennas(antennas) => {
                let antennas: Vec<Value> = antennas
                    .iter()
                    .map(|location| {
                        json!({
                            "location": {
                                "latitude": location.latitude,
                                "longitude": location.longitude,
                                "altitude": location.altitude,
                                "source": "SOURCE_REGISTRY",
                            }
                        })
                    })
                    .collect();
                json!({ FIELD_ANTENNAS: antennas })
            }
        }
    }
}
