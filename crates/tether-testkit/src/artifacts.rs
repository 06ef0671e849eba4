//! Artifact writer and audit store doubles

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tether_core::{
    ArtifactEffects, AuditEffects, AuditRecord, CredentialKind, DeviceId, IssuedCredential,
    Result, TetherError,
};

/// One credential handed to the writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    /// Device the credential belongs to
    pub device_id: DeviceId,
    /// Registry key id
    pub key_id: String,
    /// Purpose of the key
    pub kind: CredentialKind,
    /// Secret as received, kept so tests can search logs for it
    pub secret: String,
}

#[derive(Debug, Default)]
struct ArtifactState {
    written: Vec<WrittenArtifact>,
    fail_writes: bool,
}

/// Keeps every credential in memory and returns `memory://` locations
#[derive(Debug, Clone, Default)]
pub struct RecordingArtifactWriter {
    state: Arc<Mutex<ArtifactState>>,
}

impl RecordingArtifactWriter {
    /// Writer that accepts every credential
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer whose every write fails
    pub fn failing() -> Self {
        let writer = Self::default();
        writer.lock().fail_writes = true;
        writer
    }

    fn lock(&self) -> MutexGuard<'_, ArtifactState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credentials written so far
    pub fn written(&self) -> Vec<WrittenArtifact> {
        self.lock().written.clone()
    }

    /// Secrets written so far
    pub fn secrets(&self) -> Vec<String> {
        self.lock().written.iter().map(|a| a.secret.clone()).collect()
    }
}

#[async_trait]
impl ArtifactEffects for RecordingArtifactWriter {
    async fn write_credential(
        &self,
        device_id: &DeviceId,
        credential: &IssuedCredential,
    ) -> Result<String> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(TetherError::storage("artifact store is read-only"));
        }
        state.written.push(WrittenArtifact {
            device_id: device_id.clone(),
            key_id: credential.id.clone(),
            kind: credential.kind,
            secret: credential.secret.expose().to_string(),
        });
        Ok(format!("memory://{device_id}/{}", credential.kind.as_str()))
    }
}

#[derive(Debug, Default)]
struct AuditState {
    rows: Vec<AuditRecord>,
    fail_with: Option<TetherError>,
}

/// Audit store keyed on `(organization_id, gateway_eui)`
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditStore {
    state: Arc<Mutex<AuditState>>,
}

impl MemoryAuditStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose upserts fail with `error`
    pub fn failing(error: TetherError) -> Self {
        let store = Self::default();
        store.lock().fail_with = Some(error);
        store
    }

    fn lock(&self) -> MutexGuard<'_, AuditState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current rows
    pub fn rows(&self) -> Vec<AuditRecord> {
        self.lock().rows.clone()
    }
}

#[async_trait]
impl AuditEffects for MemoryAuditStore {
    async fn upsert_gateway(&self, record: &AuditRecord) -> Result<()> {
        let mut state = self.lock();
        if let Some(error) = &state.fail_with {
            return Err(error.clone());
        }
        let existing = state.rows.iter_mut().find(|row| {
            row.organization_id == record.organization_id && row.gateway_eui == record.gateway_eui
        });
        match existing {
            Some(row) => *row = record.clone(),
            None => state.rows.push(record.clone()),
        }
        Ok(())
    }
}
