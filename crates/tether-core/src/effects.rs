//! Effect traits at the seams of the provisioning core
//!
//! The state machines are written against these traits only. Production
//! handlers live in `tether-transport`; in-memory handlers for tests live in
//! `tether-testkit`.
//!
//! Registry and radio-plane calls never fail at the type level: transport
//! problems are folded into the returned [`RemoteResponse`]. Artifact and
//! audit writes are local or best-effort and return `Result`.

use crate::audit::AuditRecord;
use crate::credential::IssuedCredential;
use crate::desired::{Owner, RightSet};
use crate::identifiers::DeviceId;
use crate::payload::{GatewayPatch, GatewayRegistration};
use crate::remote::RemoteResponse;
use crate::Result;
use async_trait::async_trait;

/// Operations offered by the identity registry
#[async_trait]
pub trait IdentityRegistryEffects: Send + Sync {
    /// Read the gateway record
    async fn get_gateway(&self, device_id: &DeviceId) -> RemoteResponse;

    /// Create the gateway under a user or organization
    async fn register_gateway(
        &self,
        owner: &Owner,
        registration: &GatewayRegistration,
    ) -> RemoteResponse;

    /// Apply a field-mask partial update
    async fn update_gateway(&self, device_id: &DeviceId, patch: &GatewayPatch) -> RemoteResponse;

    /// Soft-delete the gateway
    async fn delete_gateway(&self, device_id: &DeviceId) -> RemoteResponse;

    /// Hard-delete a soft-deleted gateway, releasing its EUI
    async fn purge_gateway(&self, device_id: &DeviceId) -> RemoteResponse;

    /// Create a scoped API key; the response carries the secret once
    async fn create_api_key(
        &self,
        device_id: &DeviceId,
        label: &str,
        rights: &RightSet,
    ) -> RemoteResponse;

    /// List API keys of the gateway (no secrets)
    async fn list_api_keys(&self, device_id: &DeviceId) -> RemoteResponse;
}

/// Operations offered by the radio-plane server
#[async_trait]
pub trait RadioPlaneEffects: Send + Sync {
    /// Current connection stats; 404 means "not connected"
    async fn connection_stats(&self, device_id: &DeviceId) -> RemoteResponse;
}

/// Composed effects required by the reconciler, deprovisioner and status reporter
pub trait GatewayEffects: IdentityRegistryEffects + RadioPlaneEffects {}

/// Blanket implementation for any type that implements both sides.
impl<T> GatewayEffects for T where T: IdentityRegistryEffects + RadioPlaneEffects {}

/// Persists an issued credential to exactly one durable location
#[async_trait]
pub trait ArtifactEffects: Send + Sync {
    /// Write the credential and return where it went
    async fn write_credential(
        &self,
        device_id: &DeviceId,
        credential: &IssuedCredential,
    ) -> Result<String>;
}

/// Upserts audit rows into an external store
#[async_trait]
pub trait AuditEffects: Send + Sync {
    /// Insert or update the row for this gateway
    async fn upsert_gateway(&self, record: &AuditRecord) -> Result<()>;
}
