//! Batch provisioning
//!
//! One task per device, bounded by a semaphore. Devices share nothing but
//! the reconciler; each keeps its own run log. Results come back in input
//! order. A device id that appears twice is reconciled once: later entries
//! are aborted, since two writers on one device in one run are unsupported.

use crate::reconciler::{ProvisionReport, Reconciler};
use std::collections::HashSet;
use std::sync::Arc;
use tether_core::{DesiredState, DeviceId, GatewayEffects};
use tokio::sync::Semaphore;

/// Result for one entry of a batch
#[derive(Debug, Clone)]
pub enum BatchEntry {
    /// The reconciler ran and produced a report
    Completed(Box<ProvisionReport>),
    /// The entry was not reconciled
    Aborted {
        /// Device named by the entry
        device_id: DeviceId,
        /// Why it was not run
        reason: String,
    },
}

impl BatchEntry {
    /// Device named by the entry
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::Completed(report) => &report.device_id,
            Self::Aborted { device_id, .. } => device_id,
        }
    }

    /// Whether the entry ran and every attempted step succeeded
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed(report) if report.is_complete())
    }
}

/// Runs the reconciler over many devices concurrently
pub struct BatchRunner<E: GatewayEffects + 'static> {
    reconciler: Arc<Reconciler<E>>,
    concurrency: usize,
}

impl<E: GatewayEffects + 'static> BatchRunner<E> {
    /// Runner allowing `concurrency` devices in flight (at least one)
    pub fn new(reconciler: Arc<Reconciler<E>>, concurrency: usize) -> Self {
        Self {
            reconciler,
            concurrency: concurrency.max(1),
        }
    }

    /// Reconcile every desired state; results follow input order
    pub async fn run(&self, batch: Vec<DesiredState>) -> Vec<BatchEntry> {
        tracing::info!(
            devices = batch.len(),
            concurrency = self.concurrency,
            "starting batch"
        );
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(batch.len());

        for desired in batch {
            let device_id = desired.identity.device_id.clone();
            if !seen.insert(device_id.clone()) {
                tracing::warn!(device_id = %device_id, "duplicate device in batch, skipping");
                pending.push(Err(BatchEntry::Aborted {
                    device_id,
                    reason: "device appears earlier in the same batch".to_string(),
                }));
                continue;
            }

            let reconciler = Arc::clone(&self.reconciler);
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(reconciler.reconcile(&desired).await)
            });
            pending.push(Ok((device_id, handle)));
        }

        let mut entries = Vec::with_capacity(pending.len());
        for item in pending {
            let entry = match item {
                Err(aborted) => aborted,
                Ok((device_id, handle)) => match handle.await {
                    Ok(Some(report)) => BatchEntry::Completed(Box::new(report)),
                    Ok(None) => BatchEntry::Aborted {
                        device_id,
                        reason: "batch was shut down".to_string(),
                    },
                    Err(e) => BatchEntry::Aborted {
                        device_id,
                        reason: format!("task failed: {e}"),
                    },
                },
            };
            entries.push(entry);
        }

        let complete = entries.iter().filter(|e| e.is_complete()).count();
        tracing::info!(complete, total = entries.len(), "batch finished");
        entries
    }
}
