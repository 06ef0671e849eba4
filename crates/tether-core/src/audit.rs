//! Audit row mirrored into an external store after provisioning

use crate::desired::DesiredState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status recorded for a freshly provisioned gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Registered, hardware not yet confirmed online
    Pending,
    /// Connected to the radio plane
    Online,
    /// Registered but not connected
    Offline,
}

/// Row upserted keyed on `(organization_id, gateway_eui)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Owning organization in the audit store
    pub organization_id: String,
    /// Optional site
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    /// Hardware EUI
    pub gateway_eui: String,
    /// Display name
    pub name: String,
    /// Registry identifier
    pub ttn_gateway_id: String,
    /// Lifecycle status
    pub status: AuditStatus,
    /// Time of registration
    pub ttn_registered_at: DateTime<Utc>,
    /// Free-form provenance note
    pub description: String,
}

impl AuditRecord {
    /// Build the row for a desired state, or `None` when no audit reference was given
    pub fn from_desired(desired: &DesiredState, radio_plane_host: &str) -> Option<Self> {
        let audit = desired.audit.as_ref()?;
        Some(Self {
            organization_id: audit.organization_id.clone(),
            site_id: audit.site_id.clone(),
            gateway_eui: desired.identity.eui.to_string(),
            name: desired.display_name.clone(),
            ttn_gateway_id: desired.identity.device_id.to_string(),
            status: AuditStatus::Pending,
            ttn_registered_at: Utc::now(),
            description: format!(
                "Provisioned via {} | freq: {} | server: {radio_plane_host}",
                crate::TOOL_VERSION,
                desired.frequency_plan
            ),
        })
    }
}
