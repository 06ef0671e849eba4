//! In-memory identity registry and radio plane
//!
//! `MockGatewayBackend` keeps registry records as JSON, applies field-mask
//! updates the way the registry does, records every call in order, and lets a
//! test script the next response of any operation.
//!
//! # Blocking Lock Usage
//!
//! Uses `std::sync::Mutex`: the lock is never held across an await point and
//! contention is irrelevant in tests.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tether_core::{
    DeviceId, GatewayPatch, GatewayRegistration, IdentityRegistryEffects, Owner,
    RadioPlaneEffects, RemoteRecord, RemoteResponse, RightSet,
};

/// Remote operations, used to script responses and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Registry read
    GetGateway,
    /// Registry create
    RegisterGateway,
    /// Registry field-mask update
    UpdateGateway,
    /// Registry soft delete
    DeleteGateway,
    /// Registry purge
    PurgeGateway,
    /// Registry key creation
    CreateApiKey,
    /// Registry key listing
    ListApiKeys,
    /// Radio-plane stats
    ConnectionStats,
}

impl Operation {
    /// Whether the operation changes remote state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::RegisterGateway
                | Self::UpdateGateway
                | Self::DeleteGateway
                | Self::PurgeGateway
                | Self::CreateApiKey
        )
    }
}

/// One call observed by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// Registry read
    GetGateway(DeviceId),
    /// Registry create
    RegisterGateway {
        /// Owner named in the URL
        owner: Owner,
        /// Payload sent
        registration: GatewayRegistration,
    },
    /// Registry field-mask update
    UpdateGateway {
        /// Target gateway
        device_id: DeviceId,
        /// Patch sent
        patch: GatewayPatch,
    },
    /// Registry soft delete
    DeleteGateway(DeviceId),
    /// Registry purge
    PurgeGateway(DeviceId),
    /// Registry key creation
    CreateApiKey {
        /// Target gateway
        device_id: DeviceId,
        /// Key label
        label: String,
        /// Requested rights
        rights: RightSet,
    },
    /// Registry key listing
    ListApiKeys(DeviceId),
    /// Radio-plane stats
    ConnectionStats(DeviceId),
}

impl RecordedCall {
    /// The operation this call belongs to
    pub fn operation(&self) -> Operation {
        match self {
            Self::GetGateway(_) => Operation::GetGateway,
            Self::RegisterGateway { .. } => Operation::RegisterGateway,
            Self::UpdateGateway { .. } => Operation::UpdateGateway,
            Self::DeleteGateway(_) => Operation::DeleteGateway,
            Self::PurgeGateway(_) => Operation::PurgeGateway,
            Self::CreateApiKey { .. } => Operation::CreateApiKey,
            Self::ListApiKeys(_) => Operation::ListApiKeys,
            Self::ConnectionStats(_) => Operation::ConnectionStats,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredKey {
    id: String,
    name: String,
    rights: Vec<String>,
    secret: String,
}

#[derive(Debug, Default)]
struct BackendState {
    gateways: HashMap<DeviceId, Value>,
    soft_deleted: HashSet<DeviceId>,
    api_keys: HashMap<DeviceId, Vec<StoredKey>>,
    sessions: HashMap<DeviceId, Value>,
    scripted: HashMap<Operation, VecDeque<RemoteResponse>>,
    calls: Vec<RecordedCall>,
    next_key: u64,
}

/// Scriptable in-memory registry and radio plane
#[derive(Debug, Clone, Default)]
pub struct MockGatewayBackend {
    state: Arc<Mutex<BackendState>>,
}

fn not_found(what: &str) -> RemoteResponse {
    RemoteResponse::failure(404, json!({ "code": 5, "message": format!("{what} not found") }))
}

impl MockGatewayBackend {
    /// Empty registry, no sessions
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a registered gateway with the given server pointer
    pub fn seed_gateway(&self, device_id: &DeviceId, eui: &str, server_pointer: Option<&str>) {
        let mut record = json!({
            "ids": { "gateway_id": device_id.as_str(), "eui": eui },
            "name": format!("Seeded {device_id}"),
            "frequency_plan_ids": ["US_902_928_FSB_2"],
            "enforce_duty_cycle": true,
            "require_authenticated_connection": true,
        });
        if let (Some(pointer), Some(fields)) = (server_pointer, record.as_object_mut()) {
            fields.insert("gateway_server_address".into(), json!(pointer));
        }
        self.lock().gateways.insert(device_id.clone(), record);
    }

    /// Mark a gateway as having a live radio-plane session
    pub fn seed_session(&self, device_id: &DeviceId) {
        self.lock().sessions.insert(
            device_id.clone(),
            json!({
                "connected_at": "2026-01-01T00:00:00Z",
                "last_uplink_received_at": "2026-01-01T00:05:00Z",
                "protocol": "ws",
            }),
        );
    }

    /// Force the next call of `operation` to return `response`
    pub fn script(&self, operation: Operation, response: RemoteResponse) {
        self.lock()
            .scripted
            .entry(operation)
            .or_default()
            .push_back(response);
    }

    /// Every call observed so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of one operation
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Calls that change remote state
    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation().is_mutating())
            .cloned()
            .collect()
    }

    /// Forget recorded calls, keeping remote state
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Current registry record, if visible
    pub fn record(&self, device_id: &DeviceId) -> Option<RemoteRecord> {
        let state = self.lock();
        if state.soft_deleted.contains(device_id) {
            return None;
        }
        state
            .gateways
            .get(device_id)
            .and_then(|body| RemoteRecord::from_body(body).ok())
    }

    /// Whether any trace of the gateway remains (including soft-deleted)
    pub fn exists_anywhere(&self, device_id: &DeviceId) -> bool {
        self.lock().gateways.contains_key(device_id)
    }

    /// Number of API keys issued for a gateway
    pub fn key_count(&self, device_id: &DeviceId) -> usize {
        self.lock().api_keys.get(device_id).map_or(0, Vec::len)
    }

    /// Every secret the backend ever revealed, for leak checks
    pub fn revealed_secrets(&self) -> Vec<String> {
        self.lock()
            .api_keys
            .values()
            .flatten()
            .map(|k| k.secret.clone())
            .collect()
    }

    fn begin(&self, call: RecordedCall) -> (MutexGuard<'_, BackendState>, Option<RemoteResponse>) {
        let mut state = self.lock();
        let operation = call.operation();
        tracing::trace!(?operation, "mock backend call");
        state.calls.push(call);
        let scripted = state
            .scripted
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);
        (state, scripted)
    }
}

impl BackendState {
    fn visible(&self, device_id: &DeviceId) -> Option<&Value> {
        if self.soft_deleted.contains(device_id) {
            None
        } else {
            self.gateways.get(device_id)
        }
    }
}

#[async_trait]
impl IdentityRegistryEffects for MockGatewayBackend {
    async fn get_gateway(&self, device_id: &DeviceId) -> RemoteResponse {
        let (state, scripted) = self.begin(RecordedCall::GetGateway(device_id.clone()));
        if let Some(response) = scripted {
            return response;
        }
        match state.visible(device_id) {
            Some(record) => RemoteResponse::success(200, record.clone()),
            None => not_found("gateway"),
        }
    }

    async fn register_gateway(
        &self,
        owner: &Owner,
        registration: &GatewayRegistration,
    ) -> RemoteResponse {
        let (mut state, scripted) = self.begin(RecordedCall::RegisterGateway {
            owner: owner.clone(),
            registration: registration.clone(),
        });
        if let Some(response) = scripted {
            return response;
        }
        let device_id = match DeviceId::new(registration.ids.gateway_id.clone()) {
            Ok(id) => id,
            Err(e) => return RemoteResponse::failure(400, json!({ "message": e.to_string() })),
        };
        if state.gateways.contains_key(&device_id) {
            return RemoteResponse::failure(409, json!({ "code": 6, "message": "gateway already exists" }));
        }
        let record = match serde_json::to_value(registration) {
            Ok(record) => record,
            Err(e) => return RemoteResponse::failure(400, json!({ "message": e.to_string() })),
        };
        state.gateways.insert(device_id, record.clone());
        RemoteResponse::success(200, record)
    }

    async fn update_gateway(&self, device_id: &DeviceId, patch: &GatewayPatch) -> RemoteResponse {
        let (mut state, scripted) = self.begin(RecordedCall::UpdateGateway {
            device_id: device_id.clone(),
            patch: patch.clone(),
        });
        if let Some(response) = scripted {
            return response;
        }
        if state.soft_deleted.contains(device_id) {
            return not_found("gateway");
        }
        let Some(record) = state.gateways.get_mut(device_id).and_then(Value::as_object_mut) else {
            return not_found("gateway");
        };
        let fields = patch.gateway_fields();
        for path in patch.field_mask() {
            match fields.get(path) {
                Some(value) => record.insert(path.to_string(), value.clone()),
                None => record.remove(path),
            };
        }
        RemoteResponse::success(200, Value::Object(record.clone()))
    }

    async fn delete_gateway(&self, device_id: &DeviceId) -> RemoteResponse {
        let (mut state, scripted) = self.begin(RecordedCall::DeleteGateway(device_id.clone()));
        if let Some(response) = scripted {
            return response;
        }
        if state.visible(device_id).is_none() {
            return not_found("gateway");
        }
        state.soft_deleted.insert(device_id.clone());
        state.sessions.remove(device_id);
        RemoteResponse::success(200, Value::Object(Map::new()))
    }

    async fn purge_gateway(&self, device_id: &DeviceId) -> RemoteResponse {
        let (mut state, scripted) = self.begin(RecordedCall::PurgeGateway(device_id.clone()));
        if let Some(response) = scripted {
            return response;
        }
        if state.gateways.remove(device_id).is_none() {
            return not_found("gateway");
        }
        state.soft_deleted.remove(device_id);
        state.api_keys.remove(device_id);
        RemoteResponse::success(200, Value::Object(Map::new()))
    }

    async fn create_api_key(
        &self,
        device_id: &DeviceId,
        label: &str,
        rights: &RightSet,
    ) -> RemoteResponse {
        let (mut state, scripted) = self.begin(RecordedCall::CreateApiKey {
            device_id: device_id.clone(),
            label: label.to_string(),
            rights: rights.clone(),
        });
        if let Some(response) = scripted {
            return response;
        }
        if state.visible(device_id).is_none() {
            return not_found("gateway");
        }
        state.next_key += 1;
        let key = StoredKey {
            id: format!("KEY{:04}", state.next_key),
            name: label.to_string(),
            rights: rights.to_vec(),
            secret: format!("NNSXS.MOCKSECRET{:04}.{}", state.next_key, device_id),
        };
        let body = json!({
            "id": key.id,
            "key": key.secret,
            "name": key.name,
            "rights": key.rights,
        });
        state.api_keys.entry(device_id.clone()).or_default().push(key);
        RemoteResponse::success(200, body)
    }

    async fn list_api_keys(&self, device_id: &DeviceId) -> RemoteResponse {
        let (state, scripted) = self.begin(RecordedCall::ListApiKeys(device_id.clone()));
        if let Some(response) = scripted {
            return response;
        }
        if state.visible(device_id).is_none() {
            return not_found("gateway");
        }
        let keys: Vec<Value> = state
            .api_keys
            .get(device_id)
            .into_iter()
            .flatten()
            .map(|k| json!({ "id": k.id, "name": k.name, "rights": k.rights }))
            .collect();
        RemoteResponse::success(200, json!({ "api_keys": keys }))
    }
}

#[async_trait]
impl RadioPlaneEffects for MockGatewayBackend {
    async fn connection_stats(&self, device_id: &DeviceId) -> RemoteResponse {
        let (state, scripted) = self.begin(RecordedCall::ConnectionStats(device_id.clone()));
        if let Some(response) = scripted {
            return response;
        }
        match state.sessions.get(device_id) {
            Some(stats) => RemoteResponse::success(200, stats.clone()),
            None => not_found("gateway connection"),
        }
    }
}
