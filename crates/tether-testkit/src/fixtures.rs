//! Canonical gateways and desired states used across test suites

use tether_core::{
    CredentialKind, CredentialRequest, DesiredState, DeviceEui, DeviceId, DeviceIdentity, Owner,
    RightSet, Topology,
};

/// EUI of the default test gateway
pub const TEST_EUI: &str = "00800000A00009EF";

/// Identifier of the default test gateway
pub const TEST_DEVICE_ID: &str = "gw-a00009ef";

/// Pointer host a stale record might carry
pub const STALE_POINTER: &str = "eu1.cloud.thethings.network";

/// The default test identity
pub fn test_identity() -> DeviceIdentity {
    DeviceIdentity::new(
        DeviceId::new(TEST_DEVICE_ID).unwrap(),
        DeviceEui::parse(TEST_EUI).unwrap(),
    )
}

/// An identity derived from a numeric seed, for batch tests
pub fn numbered_identity(n: u32) -> DeviceIdentity {
    let eui = DeviceEui::parse(&format!("0080000000{n:06X}")).unwrap();
    let device_id = DeviceId::derive_from_eui("gw", &eui).unwrap();
    DeviceIdentity::new(device_id, eui)
}

/// Desired state with no optional steps
pub fn test_desired_state() -> DesiredState {
    desired_state_for(test_identity())
}

/// Desired state with no optional steps for the given identity
pub fn desired_state_for(identity: DeviceIdentity) -> DesiredState {
    DesiredState::new(
        identity,
        Owner::user("field-ops"),
        "Walk-in Cooler",
        "US_902_928_FSB_2",
    )
    .unwrap()
}

/// LNS credential request
pub fn lns_request() -> CredentialRequest {
    CredentialRequest::new(
        CredentialKind::Lns,
        "Test LNS Key",
        RightSet::new(["RIGHT_GATEWAY_LINK"]),
    )
}

/// CUPS credential request
pub fn cups_request() -> CredentialRequest {
    CredentialRequest::new(
        CredentialKind::Cups,
        "Test CUPS Key",
        RightSet::new([
            "RIGHT_GATEWAY_INFO",
            "RIGHT_GATEWAY_SETTINGS_BASIC",
            "RIGHT_GATEWAY_READ_SECRETS",
        ]),
    )
}

/// Topology used by the in-memory backend
pub fn test_topology() -> Topology {
    Topology::default()
}
