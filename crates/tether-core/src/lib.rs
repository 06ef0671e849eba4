//! # Tether Core
//!
//! Domain model shared by every Tether crate: gateway identifiers, the
//! desired state supplied by callers, normalized remote responses, the typed
//! step outcomes and run log emitted by the state machines, configuration,
//! and the effect traits the state machines are written against.
//!
//! ## What Belongs Here
//!
//! - Types that cross crate boundaries
//! - Effect traits (no implementations beyond trivial ones)
//! - The unified error type
//!
//! ## What Does NOT Belong Here
//!
//! - HTTP (tether-transport)
//! - Reconciliation logic (tether-provision)
//! - Rendering or argument parsing (tether-cli)

#![forbid(unsafe_code)]

/// Audit rows mirrored into an external store
pub mod audit;
/// Configuration loading and validation
pub mod config;
/// Issued credentials and access tokens
pub mod credential;
/// Caller-supplied desired state
pub mod desired;
/// Effect traits
pub mod effects;
/// Unified error type
pub mod errors;
/// Gateway identifiers
pub mod identifiers;
/// Registry request payloads
pub mod payload;
/// Normalized remote responses
pub mod remote;
/// Append-only run log
pub mod run_log;
/// Typed step outcomes
pub mod step;
/// Fixed two-cluster topology
pub mod topology;

pub use audit::{AuditRecord, AuditStatus};
pub use config::{AuditConfig, HttpConfig, ProvisionSettings, TetherConfig};
pub use credential::{AccessToken, CredentialReceipt, CredentialSecret, IssuedCredential};
pub use desired::{
    AntennaLocation, AuditReference, CredentialKind, CredentialRequest, DesiredState,
    GatewayFlags, Owner, OwnerKind, RightSet,
};
pub use effects::{
    ArtifactEffects, AuditEffects, GatewayEffects, IdentityRegistryEffects, RadioPlaneEffects,
};
pub use errors::{Result, TetherError};
pub use identifiers::{DeviceEui, DeviceId, DeviceIdentity};
pub use payload::{GatewayPatch, GatewayRegistration};
pub use remote::{
    ApiKeySummary, ConnectionState, RadioConnection, RemoteOutcome, RemoteRecord, RemoteResponse,
};
pub use run_log::{RunLog, RunOperation};
pub use step::{SkippedStep, StepName, StepOutcome, StepStatus};
pub use topology::Topology;

/// Tool identifier sent as user agent and stamped into run logs
pub const TOOL_VERSION: &str = concat!("tether/", env!("CARGO_PKG_VERSION"));
