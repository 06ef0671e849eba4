//! Gateway removal: `check → delete → purge? → confirm_absent`
//!
//! Purge is attempted only after the soft delete succeeded, and a failed
//! purge never undoes the soft delete. Deletion counts as complete only once
//! a re-read reports the record gone.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tether_core::{
    DeviceId, IdentityRegistryEffects, RemoteOutcome, RunLog, RunOperation, StepName,
    StepOutcome, Topology,
};

/// Caller choices for a removal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeprovisionOptions {
    /// Hard-delete after the soft delete, releasing the EUI
    pub purge: bool,
}

/// How a removal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DeprovisionOutcome {
    /// Nothing was registered; no mutation attempted
    NotFound,
    /// The gateway was deleted
    Removed {
        /// Whether the purge ran and succeeded
        purged: bool,
        /// Whether a re-read confirmed absence
        confirmed: bool,
    },
    /// A step failed; later steps were not attempted
    Failed {
        /// The failing step
        step: StepName,
    },
}

/// Outcome and log of one removal
#[derive(Debug, Clone)]
pub struct DeprovisionReport {
    /// Target device
    pub device_id: DeviceId,
    /// How the removal ended
    pub outcome: DeprovisionOutcome,
    /// Append-only run log
    pub log: RunLog,
}

/// Removes a gateway from the identity registry
pub struct Deprovisioner<R: IdentityRegistryEffects + ?Sized> {
    registry: Arc<R>,
    topology: Topology,
}

impl<R: IdentityRegistryEffects + ?Sized> Deprovisioner<R> {
    /// Deprovisioner for a fixed topology
    pub fn new(registry: Arc<R>, topology: Topology) -> Self {
        Self { registry, topology }
    }

    /// Remove one gateway
    pub async fn deprovision(
        &self,
        device_id: &DeviceId,
        options: DeprovisionOptions,
    ) -> DeprovisionReport {
        tracing::info!(device_id = %device_id, purge = options.purge, "deprovisioning gateway");
        let mut log = RunLog::new(
            device_id.clone(),
            RunOperation::Deprovision,
            self.topology.clone(),
        );
        let outcome = self.run(device_id, options, &mut log).await;
        log.finish();
        tracing::info!(device_id = %device_id, ?outcome, "deprovisioning finished");

        DeprovisionReport {
            device_id: device_id.clone(),
            outcome,
            log,
        }
    }

    async fn run(
        &self,
        device_id: &DeviceId,
        options: DeprovisionOptions,
        log: &mut RunLog,
    ) -> DeprovisionOutcome {
        let response = self.registry.get_gateway(device_id).await;
        match response.outcome() {
            RemoteOutcome::Success => {
                log.record(StepOutcome::succeeded(StepName::Check, "gateway registered"));
            }
            RemoteOutcome::NotFound => {
                log.record(StepOutcome::succeeded(
                    StepName::Check,
                    "gateway not registered, nothing to delete",
                ));
                return DeprovisionOutcome::NotFound;
            }
            RemoteOutcome::TransportFailure | RemoteOutcome::Rejected => {
                log.record(
                    StepOutcome::failed(
                        StepName::Check,
                        format!("could not read registry record {}", response.describe()),
                    )
                    .with_response(response.body),
                );
                return DeprovisionOutcome::Failed {
                    step: StepName::Check,
                };
            }
        }

        let response = self.registry.delete_gateway(device_id).await;
        if !response.ok {
            log.record(
                StepOutcome::failed(
                    StepName::Delete,
                    format!("delete failed {}", response.describe()),
                )
                .with_response(response.body),
            );
            return DeprovisionOutcome::Failed {
                step: StepName::Delete,
            };
        }
        log.record(StepOutcome::succeeded(StepName::Delete, "gateway deleted"));

        let purged = if options.purge {
            let response = self.registry.purge_gateway(device_id).await;
            if !response.ok {
                log.record(
                    StepOutcome::failed(
                        StepName::Purge,
                        format!(
                            "purge failed {}; the gateway stays soft-deleted and its EUI reserved",
                            response.describe()
                        ),
                    )
                    .with_response(response.body),
                );
                return DeprovisionOutcome::Failed {
                    step: StepName::Purge,
                };
            }
            log.record(StepOutcome::succeeded(
                StepName::Purge,
                "gateway purged, EUI released",
            ));
            true
        } else {
            log.skip(StepName::Purge, "purge not requested");
            false
        };

        let response = self.registry.get_gateway(device_id).await;
        let confirmed = match response.outcome() {
            RemoteOutcome::NotFound => {
                log.record(StepOutcome::succeeded(
                    StepName::ConfirmAbsent,
                    "gateway no longer visible",
                ));
                true
            }
            RemoteOutcome::Success => {
                log.record(StepOutcome::warning(
                    StepName::ConfirmAbsent,
                    "gateway still visible; deletion may not have propagated yet",
                ));
                false
            }
            RemoteOutcome::TransportFailure | RemoteOutcome::Rejected => {
                log.record(StepOutcome::warning(
                    StepName::ConfirmAbsent,
                    format!("deletion unconfirmed {}", response.describe()),
                ));
                false
            }
        };

        DeprovisionOutcome::Removed { purged, confirmed }
    }
}
