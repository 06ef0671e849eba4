//! Append-only log of one run
//!
//! The run log is the only persisted memory of an invocation. Steps are
//! appended in the order they were attempted and never rewritten.

use crate::credential::CredentialReceipt;
use crate::identifiers::DeviceId;
use crate::step::{SkippedStep, StepName, StepOutcome, StepStatus};
use crate::topology::Topology;
use crate::{Result, TOOL_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which state machine produced the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOperation {
    /// Reconciliation towards a desired state
    Provision,
    /// Removal of a gateway
    Deprovision,
}

impl RunOperation {
    /// Suffix used for the persisted log file
    pub fn log_suffix(&self) -> &'static str {
        match self {
            Self::Provision => "provision_log",
            Self::Deprovision => "deprovision_log",
        }
    }
}

/// Steps, skips and credential receipts of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    /// Device the run targeted
    pub device_id: DeviceId,
    /// Operation performed
    pub operation: RunOperation,
    /// Tool version that produced the log
    pub tool_version: String,
    /// Topology fixed for the run
    pub topology: Topology,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Attempted steps, in order
    pub steps: Vec<StepOutcome>,
    /// Optional steps not attempted
    #[serde(default)]
    pub skipped: Vec<SkippedStep>,
    /// Issued credentials, identifiers only
    #[serde(default)]
    pub credentials: Vec<CredentialReceipt>,
}

impl RunLog {
    /// Start an empty log
    pub fn new(device_id: DeviceId, operation: RunOperation, topology: Topology) -> Self {
        Self {
            device_id,
            operation,
            tool_version: TOOL_VERSION.to_string(),
            topology,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            skipped: Vec::new(),
            credentials: Vec::new(),
        }
    }

    /// Append an attempted step
    pub fn record(&mut self, outcome: StepOutcome) {
        match outcome.status {
            StepStatus::Succeeded => {
                tracing::info!(step = %outcome.step, "{}", outcome.message);
            }
            StepStatus::Warning => {
                tracing::warn!(step = %outcome.step, "{}", outcome.message);
            }
            StepStatus::Failed => {
                tracing::warn!(step = %outcome.step, failed = true, "{}", outcome.message);
            }
        }
        self.steps.push(outcome);
    }

    /// Note an optional step that was not attempted
    pub fn skip(&mut self, step: StepName, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(step = %step, "skipped: {reason}");
        self.skipped.push(SkippedStep { step, reason });
    }

    /// Keep the secret-free receipt of an issued credential
    pub fn add_receipt(&mut self, receipt: CredentialReceipt) {
        self.credentials.push(receipt);
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Number of attempted steps
    pub fn total(&self) -> usize {
        self.steps.len()
    }

    /// Number of attempted steps that did not fail
    pub fn succeeded_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_success()).count()
    }

    /// Number of failed steps
    pub fn failed_count(&self) -> usize {
        self.total() - self.succeeded_count()
    }

    /// Failed steps in order
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.is_success())
    }

    /// Latest outcome of a step, if attempted
    pub fn step(&self, step: StepName) -> Option<&StepOutcome> {
        self.steps.iter().rev().find(|s| s.step == step)
    }

    /// Whether a step was attempted at all
    pub fn attempted(&self, step: StepName) -> bool {
        self.step(step).is_some()
    }

    /// File name the log is persisted under
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.device_id, self.operation.log_suffix())
    }

    /// Pretty JSON rendering for persistence
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> RunLog {
        RunLog::new(
            DeviceId::new("gw-a00009ef").unwrap(),
            RunOperation::Provision,
            Topology::default(),
        )
    }

    #[test]
    fn test_counts() {
        let mut log = log();
        log.record(StepOutcome::succeeded(StepName::Register, "ok"));
        log.record(StepOutcome::failed(StepName::SetLocation, "400"));
        log.record(StepOutcome::warning(StepName::VerifyRadioPlane, "lag"));
        log.skip(StepName::StoreAudit, "not configured");

        assert_eq!(log.total(), 3);
        assert_eq!(log.succeeded_count(), 2);
        assert_eq!(log.failed_count(), 1);
        assert_eq!(log.skipped.len(), 1);
        assert!(!log.attempted(StepName::StoreAudit));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(log().file_name(), "gw-a00009ef_provision_log.json");
    }

    #[test]
    fn test_json_round_trip_preserves_steps() {
        let mut log = log();
        log.record(StepOutcome::succeeded(StepName::CheckExisting, "found"));
        log.finish();
        let json = log.to_json_pretty().unwrap();
        let parsed: RunLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.steps, log.steps);
        assert!(parsed.finished_at.is_some());
    }
}
