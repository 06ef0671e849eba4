//! Provisioning reconciler
//!
//! Reads the registry record, classifies it, and applies the smallest ordered
//! sequence of idempotent corrections that brings it to the desired state:
//!
//! ```text
//! Unknown ──read──▶ Absent ─────────register──────────┐
//!                   PresentDrifted ──pointer update───┤
//!                   PresentCorrect ───────────────────┴─▶ Converged
//! Converged ──location? ──keys? ──radio-plane check──▶ Verified ──audit?
//! ```
//!
//! A failed read, a failed registration or an expired run deadline moves the
//! run to `Halted`. Every other failure is recorded and the run continues.
//! A failed pointer update leaves the run in `PresentDrifted`: later steps
//! still run but the state never reaches `Converged` or `Verified`.

use crate::credentials::CredentialIssuer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    ArtifactEffects, AuditEffects, AuditRecord, ConnectionState, CredentialKind, DesiredState,
    DeviceId, GatewayEffects, GatewayPatch, GatewayRegistration, ProvisionSettings,
    RadioConnection, RemoteOutcome, RemoteRecord, RunLog, RunOperation, StepName, StepOutcome,
    TetherError, Topology,
};
use tokio::time::Instant;

/// Reconciliation states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    /// Nothing read yet
    Unknown,
    /// The registry has no record
    Absent,
    /// Record exists and points at the radio-plane host
    PresentCorrect,
    /// Record exists with a missing or foreign pointer
    PresentDrifted,
    /// Record exists with the correct pointer
    Converged,
    /// The radio-plane server answered the connection check
    Verified,
    /// A fatal step stopped the run
    Halted,
}

/// Tunables of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Pause before the radio-plane check after the registry was changed
    pub propagation_delay: Duration,
    /// Deadline checked before each step after the initial read
    pub run_deadline: Option<Duration>,
}

impl ReconcilerOptions {
    /// Options taken from configuration
    pub fn from_settings(settings: &ProvisionSettings) -> Self {
        Self {
            propagation_delay: settings.propagation_delay(),
            run_deadline: settings.run_deadline(),
        }
    }
}

/// Everything a provisioning run produced
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// Target device
    pub device_id: DeviceId,
    /// State classified from the initial read
    pub observed: ReconcileState,
    /// Pointer found on an existing record
    pub observed_pointer: Option<String>,
    /// State reached when the run stopped
    pub state: ReconcileState,
    /// Step that halted the run, if any
    pub halted_at: Option<StepName>,
    /// Radio-plane session, when the check answered
    pub connection: Option<RadioConnection>,
    /// Append-only run log
    pub log: RunLog,
}

impl ProvisionReport {
    /// Whether every attempted step succeeded
    pub fn is_complete(&self) -> bool {
        self.halted_at.is_none() && self.log.failed_count() == 0
    }
}

/// Marker returned when the run cannot continue
struct Halt(StepName);

struct Run {
    log: RunLog,
    started: Instant,
    deadline: Option<Duration>,
    observed: ReconcileState,
    observed_pointer: Option<String>,
    state: ReconcileState,
    registry_changed: bool,
    connection: Option<RadioConnection>,
}

impl Run {
    /// Record a failed `deadline` step when the run is out of time
    fn checkpoint(&mut self, next: StepName) -> Result<(), Halt> {
        let Some(deadline) = self.deadline else {
            return Ok(());
        };
        if self.started.elapsed() < deadline {
            return Ok(());
        }
        self.log.record(StepOutcome::failed(
            StepName::Deadline,
            format!(
                "run deadline of {}s reached before {next}",
                deadline.as_secs_f64()
            ),
        ));
        Err(Halt(StepName::Deadline))
    }
}

/// Drives one device from its observed state to the desired state
pub struct Reconciler<E: GatewayEffects> {
    effects: Arc<E>,
    topology: Topology,
    artifacts: Arc<dyn ArtifactEffects>,
    audit: Option<Arc<dyn AuditEffects>>,
    options: ReconcilerOptions,
}

impl<E: GatewayEffects> Reconciler<E> {
    /// Reconciler for a fixed topology
    pub fn new(effects: Arc<E>, topology: Topology, artifacts: Arc<dyn ArtifactEffects>) -> Self {
        Self {
            effects,
            topology,
            artifacts,
            audit: None,
            options: ReconcilerOptions::default(),
        }
    }

    /// Mirror provisioned gateways into an audit store
    pub fn with_audit(mut self, audit: Arc<dyn AuditEffects>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replace the run options
    pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Reconcile one device. Always returns a report; failures live in its log.
    pub async fn reconcile(&self, desired: &DesiredState) -> ProvisionReport {
        let device_id = desired.identity.device_id.clone();
        tracing::info!(device_id = %device_id, owner = %desired.owner, "reconciling gateway");

        let mut run = Run {
            log: RunLog::new(
                device_id.clone(),
                RunOperation::Provision,
                self.topology.clone(),
            ),
            started: Instant::now(),
            deadline: self.options.run_deadline,
            observed: ReconcileState::Unknown,
            observed_pointer: None,
            state: ReconcileState::Unknown,
            registry_changed: false,
            connection: None,
        };

        let halted_at = match self.drive(desired, &mut run).await {
            Ok(()) => None,
            Err(Halt(step)) => {
                tracing::warn!(device_id = %device_id, %step, "run halted");
                run.state = ReconcileState::Halted;
                Some(step)
            }
        };
        run.log.finish();

        tracing::info!(
            device_id = %device_id,
            state = ?run.state,
            succeeded = run.log.succeeded_count(),
            total = run.log.total(),
            "reconciliation finished"
        );

        ProvisionReport {
            device_id,
            observed: run.observed,
            observed_pointer: run.observed_pointer,
            state: run.state,
            halted_at,
            connection: run.connection,
            log: run.log,
        }
    }

    async fn drive(&self, desired: &DesiredState, run: &mut Run) -> Result<(), Halt> {
        run.observed = self.observe(desired, run).await?;
        run.state = run.observed;

        if self.converge(desired, run).await? {
            run.state = ReconcileState::Converged;
        }

        self.apply_location(desired, run).await?;
        self.issue_credentials(desired, run).await?;
        let answered = self.verify_radio_plane(desired, run).await?;
        if answered && run.state == ReconcileState::Converged {
            run.state = ReconcileState::Verified;
        }
        self.store_audit(desired, run).await
    }

    async fn observe(
        &self,
        desired: &DesiredState,
        run: &mut Run,
    ) -> Result<ReconcileState, Halt> {
        let device_id = &desired.identity.device_id;
        let response = self.effects.get_gateway(device_id).await;

        match response.outcome() {
            RemoteOutcome::NotFound => {
                tracing::info!(device_id = %device_id, "gateway not registered");
                Ok(ReconcileState::Absent)
            }
            RemoteOutcome::Success => {
                let record = match RemoteRecord::from_body(&response.body) {
                    Ok(record) => record,
                    Err(e) => {
                        run.log.record(StepOutcome::failed(
                            StepName::CheckExisting,
                            format!("registry record unreadable: {e}"),
                        ));
                        return Err(Halt(StepName::CheckExisting));
                    }
                };
                run.observed_pointer = record.server_pointer.clone();
                if self.topology.pointer_matches(record.server_pointer.as_deref()) {
                    run.log.record(StepOutcome::succeeded(
                        StepName::CheckExisting,
                        format!(
                            "already registered, pointing at {}",
                            self.topology.radio_plane_host
                        ),
                    ));
                    Ok(ReconcileState::PresentCorrect)
                } else {
                    let observed = record.server_pointer.as_deref().unwrap_or("<unset>");
                    tracing::warn!(
                        device_id = %device_id,
                        observed,
                        expected = %self.topology.radio_plane_host,
                        "server pointer drifted"
                    );
                    run.log.record(StepOutcome::succeeded(
                        StepName::CheckExisting,
                        format!(
                            "already registered, pointing at {observed} instead of {}",
                            self.topology.radio_plane_host
                        ),
                    ));
                    Ok(ReconcileState::PresentDrifted)
                }
            }
            RemoteOutcome::TransportFailure | RemoteOutcome::Rejected => {
                run.log.record(
                    StepOutcome::failed(
                        StepName::CheckExisting,
                        format!("could not read registry record {}", response.describe()),
                    )
                    .with_response(response.body),
                );
                Err(Halt(StepName::CheckExisting))
            }
        }
    }

    /// Returns whether the record now carries the correct pointer
    async fn converge(&self, desired: &DesiredState, run: &mut Run) -> Result<bool, Halt> {
        let device_id = &desired.identity.device_id;
        match run.observed {
            ReconcileState::Absent => {
                run.checkpoint(StepName::Register)?;
                let registration = GatewayRegistration::from_desired(desired, &self.topology);
                let response = self
                    .effects
                    .register_gateway(&desired.owner, &registration)
                    .await;
                if response.ok {
                    run.registry_changed = true;
                    run.log.record(StepOutcome::succeeded(
                        StepName::Register,
                        format!(
                            "registered under {} pointing at {}",
                            desired.owner, registration.gateway_server_address
                        ),
                    ));
                    Ok(true)
                } else {
                    let error = TetherError::fatal_setup(format!(
                        "registration under {} failed {}",
                        desired.owner,
                        response.describe()
                    ));
                    run.log.record(
                        StepOutcome::failed(StepName::Register, error.to_string())
                            .with_response(response.body),
                    );
                    Err(Halt(StepName::Register))
                }
            }
            ReconcileState::PresentDrifted => {
                run.checkpoint(StepName::UpdateServerAddress)?;
                let patch = GatewayPatch::ServerPointer(self.topology.radio_plane_host.clone());
                let response = self.effects.update_gateway(device_id, &patch).await;
                if response.ok {
                    run.registry_changed = true;
                    run.log.record(StepOutcome::succeeded(
                        StepName::UpdateServerAddress,
                        format!(
                            "server pointer set to {}",
                            self.topology.radio_plane_host
                        ),
                    ));
                    Ok(true)
                } else {
                    run.log.record(
                        StepOutcome::failed(
                            StepName::UpdateServerAddress,
                            format!("server pointer update failed {}", response.describe()),
                        )
                        .with_response(response.body),
                    );
                    Ok(false)
                }
            }
            _ => Ok(true),
        }
    }

    async fn apply_location(&self, desired: &DesiredState, run: &mut Run) -> Result<(), Halt> {
        let Some(location) = desired.location else {
            run.log.skip(StepName::SetLocation, "no antenna location given");
            return Ok(());
        };
        run.checkpoint(StepName::SetLocation)?;

        let patch = GatewayPatch::Antennas(vec![location]);
        let response = self
            .effects
            .update_gateway(&desired.identity.device_id, &patch)
            .await;
        if response.ok {
            run.registry_changed = true;
            run.log.record(StepOutcome::succeeded(
                StepName::SetLocation,
                format!(
                    "antenna at {}, {} ({} m)",
                    location.latitude, location.longitude, location.altitude
                ),
            ));
        } else {
            run.log.record(
                StepOutcome::failed(
                    StepName::SetLocation,
                    format!("location update failed {}", response.describe()),
                )
                .with_response(response.body),
            );
        }
        Ok(())
    }

    async fn issue_credentials(&self, desired: &DesiredState, run: &mut Run) -> Result<(), Halt> {
        for kind in [CredentialKind::Lns, CredentialKind::Cups] {
            if !desired.credentials.iter().any(|r| r.kind == kind) {
                run.log.skip(StepName::CreateKey(kind), format!("no {kind} key requested"));
            }
        }

        let issuer = CredentialIssuer::new(self.effects.as_ref(), self.artifacts.as_ref());
        for request in &desired.credentials {
            run.checkpoint(StepName::CreateKey(request.kind))?;
            let issuance = issuer.issue(&desired.identity.device_id, request).await;
            run.log.record(issuance.outcome);
            if let Some(receipt) = issuance.receipt {
                run.log.add_receipt(receipt);
            }
        }
        Ok(())
    }

    /// Returns whether the radio plane answered (connected or not)
    async fn verify_radio_plane(
        &self,
        desired: &DesiredState,
        run: &mut Run,
    ) -> Result<bool, Halt> {
        run.checkpoint(StepName::VerifyRadioPlane)?;
        if run.registry_changed && !self.options.propagation_delay.is_zero() {
            tracing::debug!(
                delay_ms = self.options.propagation_delay.as_millis() as u64,
                "waiting for registry changes to propagate"
            );
            tokio::time::sleep(self.options.propagation_delay).await;
        }

        let response = self
            .effects
            .connection_stats(&desired.identity.device_id)
            .await;
        match response.outcome() {
            RemoteOutcome::Success => {
                let state = ConnectionState::from_body(&response.body).unwrap_or_default();
                let message = match &state.connected_at {
                    Some(at) => format!("connected to {} since {at}", self.topology.radio_plane_host),
                    None => format!("connected to {}", self.topology.radio_plane_host),
                };
                run.log.record(
                    StepOutcome::succeeded(StepName::VerifyRadioPlane, message)
                        .with_response(response.body),
                );
                run.connection = Some(RadioConnection::Connected(state));
                Ok(true)
            }
            RemoteOutcome::NotFound => {
                run.log.record(StepOutcome::succeeded(
                    StepName::VerifyRadioPlane,
                    format!(
                        "known to {}, not yet connected",
                        self.topology.radio_plane_host
                    ),
                ));
                run.connection = Some(RadioConnection::NotConnected);
                Ok(true)
            }
            RemoteOutcome::TransportFailure | RemoteOutcome::Rejected => {
                run.log.record(
                    StepOutcome::failed(
                        StepName::VerifyRadioPlane,
                        format!("radio-plane check failed {}", response.describe()),
                    )
                    .with_response(response.body),
                );
                Ok(false)
            }
        }
    }

    async fn store_audit(&self, desired: &DesiredState, run: &mut Run) -> Result<(), Halt> {
        let Some(store) = &self.audit else {
            run.log.skip(StepName::StoreAudit, "audit store not configured");
            return Ok(());
        };
        let Some(record) = AuditRecord::from_desired(desired, &self.topology.radio_plane_host)
        else {
            run.log.skip(StepName::StoreAudit, "no audit organization given");
            return Ok(());
        };
        run.checkpoint(StepName::StoreAudit)?;

        match store.upsert_gateway(&record).await {
            Ok(()) => run.log.record(StepOutcome::succeeded(
                StepName::StoreAudit,
                format!("audit row stored for {}", record.organization_id),
            )),
            Err(e) => run.log.record(StepOutcome::failed(
                StepName::StoreAudit,
                format!("audit upsert failed: {e}"),
            )),
        }
        Ok(())
    }
}
