//! Desired state of a gateway
//!
//! Supplied once per run by the caller and never mutated while the run is
//! in progress.

use crate::identifiers::{check_registry_id, DeviceIdentity};
use crate::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of registry principal that owns the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// A registry user account
    User,
    /// A registry organization
    #[serde(alias = "org")]
    Organization,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Organization => f.write_str("organization"),
        }
    }
}

/// Owner under which the gateway is registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Principal kind
    pub kind: OwnerKind,
    /// Principal identifier in the registry
    pub id: String,
}

impl Owner {
    /// A user owner
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::User,
            id: id.into(),
        }
    }

    /// An organization owner
    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Organization,
            id: id.into(),
        }
    }

    /// Check the id against registry id rules.
    ///
    /// The id becomes a URL path segment, so anything else is refused.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(TetherError::invalid("owner id is required"));
        }
        check_registry_id("owner id", &self.id)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Registry enforcement and visibility flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFlags {
    /// Enforce regional duty-cycle limits
    pub enforce_duty_cycle: bool,
    /// Reject unauthenticated gateway connections
    pub require_authenticated_connection: bool,
    /// Publish gateway status
    pub status_public: bool,
    /// Publish gateway location
    pub location_public: bool,
}

impl Default for GatewayFlags {
    fn default() -> Self {
        Self {
            enforce_duty_cycle: true,
            require_authenticated_connection: true,
            status_public: false,
            location_public: false,
        }
    }
}

/// Antenna placement, applied as its own field-mask update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntennaLocation {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
    /// Meters above sea level
    #[serde(default)]
    pub altitude: f64,
}

impl AntennaLocation {
    /// Validate coordinate ranges
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(TetherError::invalid(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(TetherError::invalid(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        if !altitude.is_finite() {
            return Err(TetherError::invalid("altitude must be finite"));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude,
        })
    }
}

/// Purpose of an issued credential; also names its artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Key used by the gateway to link to the radio plane (LNS)
    Lns,
    /// Key used for configuration and update server access (CUPS)
    Cups,
}

impl CredentialKind {
    /// Lower-case short name used in step and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lns => "lns",
            Self::Cups => "cups",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Explicit set of capability rights requested for a credential
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RightSet(BTreeSet<String>);

impl RightSet {
    /// Collect rights, dropping duplicates
    pub fn new<I, S>(rights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(rights.into_iter().map(Into::into).collect())
    }

    /// Whether no rights were requested
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct rights
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate rights in a stable order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Rights as an owned list for request payloads
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// One credential the caller wants issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    /// Purpose of the credential
    pub kind: CredentialKind,
    /// Human-readable label stored with the key in the registry
    pub label: String,
    /// Rights scoped to this credential; never defaulted by the core
    pub rights: RightSet,
}

impl CredentialRequest {
    /// Describe a credential request
    pub fn new(kind: CredentialKind, label: impl Into<String>, rights: RightSet) -> Self {
        Self {
            kind,
            label: label.into(),
            rights,
        }
    }
}

/// Reference used when mirroring the gateway into the audit store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReference {
    /// Owning organization in the audit store
    pub organization_id: String,
    /// Optional site within the organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

/// Complete desired state for one gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Immutable identifiers
    pub identity: DeviceIdentity,
    /// Owner the gateway is registered under
    pub owner: Owner,
    /// Display name
    pub display_name: String,
    /// Frequency plan identifier
    pub frequency_plan: String,
    /// Enforcement and visibility flags
    pub flags: GatewayFlags,
    /// Optional antenna location
    pub location: Option<AntennaLocation>,
    /// Credentials to issue, in order
    pub credentials: Vec<CredentialRequest>,
    /// Optional audit store mirroring
    pub audit: Option<AuditReference>,
}

impl DesiredState {
    /// Start a desired state with default flags and no optional steps
    pub fn new(
        identity: DeviceIdentity,
        owner: Owner,
        display_name: impl Into<String>,
        frequency_plan: impl Into<String>,
    ) -> Result<Self> {
        let state = Self {
            identity,
            owner,
            display_name: display_name.into(),
            frequency_plan: frequency_plan.into(),
            flags: GatewayFlags::default(),
            location: None,
            credentials: Vec::new(),
            audit: None,
        };
        state.validate()?;
        Ok(state)
    }

    /// Replace the enforcement flags
    pub fn with_flags(mut self, flags: GatewayFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Request an antenna location update
    pub fn with_location(mut self, location: AntennaLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Append a credential request
    pub fn with_credential(mut self, request: CredentialRequest) -> Self {
        self.credentials.push(request);
        self
    }

    /// Mirror the gateway into the audit store
    pub fn with_audit(mut self, audit: AuditReference) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Check caller-supplied text fields
    pub fn validate(&self) -> Result<()> {
        self.owner.validate()?;
        if self.display_name.trim().is_empty() {
            return Err(TetherError::invalid("display name is required"));
        }
        if self.frequency_plan.trim().is_empty() {
            return Err(TetherError::invalid("frequency plan is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{DeviceEui, DeviceId};
    use assert_matches::assert_matches;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new(
            DeviceId::new("gw-a00009ef").unwrap(),
            DeviceEui::parse("00800000A00009EF").unwrap(),
        )
    }

    #[test]
    fn test_owner_kind_accepts_org_alias() {
        let kind: OwnerKind = serde_json::from_str("\"org\"").unwrap();
        assert_eq!(kind, OwnerKind::Organization);
    }

    #[test]
    fn test_location_ranges() {
        assert!(AntennaLocation::new(45.0, -122.0, 10.0).is_ok());
        assert!(AntennaLocation::new(91.0, 0.0, 0.0).is_err());
        assert!(AntennaLocation::new(0.0, 181.0, 0.0).is_err());
        assert!(AntennaLocation::new(0.0, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_right_set_dedups() {
        let rights = RightSet::new(["RIGHT_GATEWAY_LINK", "RIGHT_GATEWAY_LINK"]);
        assert_eq!(rights.len(), 1);
    }

    #[test]
    fn test_desired_state_requires_owner() {
        let result = DesiredState::new(identity(), Owner::user("  "), "GW", "US_902_928_FSB_2");
        assert!(result.is_err());
    }

    #[test]
    fn test_owner_id_must_be_a_registry_id() {
        for bad in ["ops/../../gateways/victim?x=", "Field-Ops", "ops%2f", "o"] {
            let result = DesiredState::new(identity(), Owner::user(bad), "GW", "US_902_928_FSB_2");
            assert_matches!(result, Err(TetherError::Invalid { .. }), "{bad}");
        }
        assert!(Owner::organization("cold-chain-2").validate().is_ok());
    }

    #[test]
    fn test_builder_defaults() {
        let state = DesiredState::new(identity(), Owner::user("ops"), "GW", "US_902_928_FSB_2")
            .unwrap();
        assert!(state.flags.enforce_duty_cycle);
        assert!(state.flags.require_authenticated_connection);
        assert!(state.location.is_none());
        assert!(state.credentials.is_empty());
    }
}
