//! The Things Stack v3 REST handlers
//!
//! Registry calls go to the topology's identity endpoint, connection stats to
//! its radio-plane endpoint. Both use the same token.

use crate::client::ApiClient;
use async_trait::async_trait;
use serde_json::json;
use tether_core::{
    AccessToken, DeviceId, GatewayPatch, GatewayRegistration, HttpConfig,
    IdentityRegistryEffects, Owner, OwnerKind, RadioPlaneEffects, RemoteResponse, Result,
    RightSet, Topology,
};

/// Fields requested when reading a gateway record
pub const GATEWAY_FIELD_MASK: &str = "ids,name,frequency_plan_ids,gateway_server_address,antennas,status_public,location_public,enforce_duty_cycle,require_authenticated_connection";

/// HTTP implementation of the registry and radio-plane effects
#[derive(Debug, Clone)]
pub struct HttpGatewayBackend {
    client: ApiClient,
    topology: Topology,
}

impl HttpGatewayBackend {
    /// Backend for a fixed topology
    pub fn new(token: &AccessToken, topology: Topology, http: &HttpConfig) -> Result<Self> {
        topology.validate()?;
        Ok(Self {
            client: ApiClient::new(token, http)?,
            topology,
        })
    }

    fn gateway_url(&self, device_id: &DeviceId) -> String {
        format!(
            "{}/api/v3/gateways/{device_id}",
            self.topology.identity_base()
        )
    }

    fn owner_url(&self, owner: &Owner) -> String {
        let collection = match owner.kind {
            OwnerKind::User => "users",
            OwnerKind::Organization => "organizations",
        };
        format!(
            "{}/api/v3/{collection}/{}/gateways",
            self.topology.identity_base(),
            owner.id
        )
    }
}

#[async_trait]
impl IdentityRegistryEffects for HttpGatewayBackend {
    async fn get_gateway(&self, device_id: &DeviceId) -> RemoteResponse {
        let url = format!(
            "{}?field_mask={GATEWAY_FIELD_MASK}",
            self.gateway_url(device_id)
        );
        self.client.get(&url).await
    }

    async fn register_gateway(
        &self,
        owner: &Owner,
        registration: &GatewayRegistration,
    ) -> RemoteResponse {
        if let Err(e) = owner.validate() {
            tracing::warn!(owner = %owner, "refusing registration under an invalid owner id");
            return RemoteResponse::transport_error(e.to_string());
        }
        let body = json!({ "gateway": registration });
        self.client.post(&self.owner_url(owner), &body).await
    }

    async fn update_gateway(&self, device_id: &DeviceId, patch: &GatewayPatch) -> RemoteResponse {
        let mut gateway = patch.gateway_fields();
        if let Some(fields) = gateway.as_object_mut() {
            fields.insert("ids".into(), json!({ "gateway_id": device_id.as_str() }));
        }
        let body = json!({
            "gateway": gateway,
            "field_mask": { "paths": patch.field_mask() },
        });
        self.client.put(&self.gateway_url(device_id), &body).await
    }

    async fn delete_gateway(&self, device_id: &DeviceId) -> RemoteResponse {
        self.client.delete(&self.gateway_url(device_id)).await
    }

    async fn purge_gateway(&self, device_id: &DeviceId) -> RemoteResponse {
        let url = format!("{}/purge", self.gateway_url(device_id));
        self.client.delete(&url).await
    }

    async fn create_api_key(
        &self,
        device_id: &DeviceId,
        label: &str,
        rights: &RightSet,
    ) -> RemoteResponse {
        let url = format!("{}/api-keys", self.gateway_url(device_id));
        let body = json!({ "name": label, "rights": rights.to_vec() });
        self.client.post(&url, &body).await
    }

    async fn list_api_keys(&self, device_id: &DeviceId) -> RemoteResponse {
        let url = format!("{}/api-keys", self.gateway_url(device_id));
        self.client.get(&url).await
    }
}

#[async_trait]
impl RadioPlaneEffects for HttpGatewayBackend {
    async fn connection_stats(&self, device_id: &DeviceId) -> RemoteResponse {
        let url = format!(
            "{}/api/v3/gs/gateways/{device_id}/connection/stats",
            self.topology.radio_plane_base()
        );
        self.client.get(&url).await
    }
}
