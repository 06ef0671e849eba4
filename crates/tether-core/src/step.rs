//! Typed step outcomes emitted by the state machines
//!
//! State machines only emit these values; rendering them is the caller's job.

use crate::desired::CredentialKind;
use crate::TetherError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Every step a run can attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepName {
    /// Read the registry record
    CheckExisting,
    /// Create the record under its owner
    Register,
    /// Field-mask update of the server pointer
    UpdateServerAddress,
    /// Field-mask update of the antenna list
    SetLocation,
    /// Issue one credential
    CreateKey(CredentialKind),
    /// Query the radio-plane server for the session
    VerifyRadioPlane,
    /// Upsert the audit row
    StoreAudit,
    /// The run deadline expired before the next step
    Deadline,
    /// Deprovision: read the record
    Check,
    /// Deprovision: soft delete
    Delete,
    /// Deprovision: hard delete
    Purge,
    /// Deprovision: re-read and expect absence
    ConfirmAbsent,
}

impl StepName {
    /// Stable snake_case name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckExisting => "check_existing",
            Self::Register => "register",
            Self::UpdateServerAddress => "update_server_address",
            Self::SetLocation => "set_location",
            Self::CreateKey(CredentialKind::Lns) => "create_lns_key",
            Self::CreateKey(CredentialKind::Cups) => "create_cups_key",
            Self::VerifyRadioPlane => "verify_radio_plane",
            Self::StoreAudit => "store_audit",
            Self::Deadline => "deadline",
            Self::Check => "check",
            Self::Delete => "delete",
            Self::Purge => "purge",
            Self::ConfirmAbsent => "confirm_absent",
        }
    }

    const ALL: [StepName; 13] = [
        Self::CheckExisting,
        Self::Register,
        Self::UpdateServerAddress,
        Self::SetLocation,
        Self::CreateKey(CredentialKind::Lns),
        Self::CreateKey(CredentialKind::Cups),
        Self::VerifyRadioPlane,
        Self::StoreAudit,
        Self::Deadline,
        Self::Check,
        Self::Delete,
        Self::Purge,
        Self::ConfirmAbsent,
    ];
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StepName {
    type Error = TetherError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == value)
            .ok_or_else(|| TetherError::serialization(format!("unknown step '{value}'")))
    }
}

impl From<StepName> for String {
    fn from(step: StepName) -> Self {
        step.as_str().to_string()
    }
}

/// Result of one attempted step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step did what it set out to do
    Succeeded,
    /// The step completed but observed something the operator should check
    Warning,
    /// The step failed
    Failed,
}

/// One entry of the run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Which step
    pub step: StepName,
    /// How it ended
    pub status: StepStatus,
    /// Human-readable detail
    pub message: String,
    /// Remote payload worth keeping; never contains secrets
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub response: Value,
    /// When the outcome was recorded
    pub at: DateTime<Utc>,
}

impl StepOutcome {
    fn new(step: StepName, status: StepStatus, message: impl Into<String>) -> Self {
        Self {
            step,
            status,
            message: message.into(),
            response: Value::Null,
            at: Utc::now(),
        }
    }

    /// A successful step
    pub fn succeeded(step: StepName, message: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Succeeded, message)
    }

    /// A step that completed with a caveat
    pub fn warning(step: StepName, message: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Warning, message)
    }

    /// A failed step
    pub fn failed(step: StepName, message: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Failed, message)
    }

    /// Attach a remote payload
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = response;
        self
    }

    /// Anything but `Failed` counts as success in summaries
    pub fn is_success(&self) -> bool {
        self.status != StepStatus::Failed
    }
}

/// An optional step that was not attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStep {
    /// Which step
    pub step: StepName,
    /// Why it was not attempted
    pub reason: String,
}
