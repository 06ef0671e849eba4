//! Gateway descriptions supplied on the command line or in a batch file
//!
//! A batch file is either `{"owner_id", "owner_type", "gateways": [...]}` or
//! a single gateway object. Per-gateway owner fields override the file-level
//! ones. Both entry points end in [`GatewaySpec::into_desired`].

use crate::presets;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tether_core::{
    AntennaLocation, AuditReference, DesiredState, DeviceEui, DeviceId, DeviceIdentity, Owner,
    OwnerKind, ProvisionSettings, Result, TetherError,
};

fn default_true() -> bool {
    true
}

/// One gateway as described by the operator
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GatewaySpec {
    /// Hardware EUI, any common separator accepted
    pub gateway_eui: String,
    /// Registry id; derived from the EUI when absent
    #[serde(default)]
    pub gateway_id: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Owner id; falls back to the file-level owner
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Owner kind; falls back to the file-level kind, then `user`
    #[serde(default)]
    pub owner_type: Option<OwnerKind>,
    /// Frequency plan; falls back to configuration
    #[serde(default)]
    pub frequency_plan: Option<String>,
    /// Antenna latitude
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Antenna longitude
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Antenna altitude in meters
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Issue an LNS key
    #[serde(default = "default_true")]
    pub generate_lns_key: bool,
    /// Issue a CUPS key
    #[serde(default)]
    pub generate_cups_key: bool,
    /// Audit store organization
    #[serde(default, alias = "fg_org_id")]
    pub audit_org_id: Option<String>,
    /// Audit store site
    #[serde(default, alias = "fg_site_id")]
    pub audit_site_id: Option<String>,
}

/// Owner applied to gateways that name none
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OwnerDefaults {
    /// Owner id
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Owner kind
    #[serde(default)]
    pub owner_type: Option<OwnerKind>,
}

#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(flatten)]
    owner: OwnerDefaults,
    #[serde(default)]
    gateways: Vec<GatewaySpec>,
}

impl GatewaySpec {
    /// Spec for an EUI with every optional field unset
    pub fn new(gateway_eui: impl Into<String>) -> Self {
        Self {
            gateway_eui: gateway_eui.into(),
            gateway_id: None,
            name: None,
            owner_id: None,
            owner_type: None,
            frequency_plan: None,
            latitude: None,
            longitude: None,
            altitude: None,
            generate_lns_key: true,
            generate_cups_key: false,
            audit_org_id: None,
            audit_site_id: None,
        }
    }

    /// Resolve defaults and validate into a desired state
    pub fn into_desired(
        self,
        defaults: &OwnerDefaults,
        settings: &ProvisionSettings,
        today: NaiveDate,
    ) -> Result<DesiredState> {
        let eui = DeviceEui::parse(&self.gateway_eui)?;
        let device_id = match self.gateway_id {
            Some(id) => DeviceId::new(id)?,
            None => DeviceId::derive_from_eui(&settings.device_id_prefix, &eui)?,
        };

        let owner_id = self
            .owner_id
            .or_else(|| defaults.owner_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| TetherError::invalid(format!("gateway {eui}: owner id is required")))?;
        let owner = Owner {
            kind: self
                .owner_type
                .or(defaults.owner_type)
                .unwrap_or(OwnerKind::User),
            id: owner_id,
        };

        let name = self.name.unwrap_or_else(|| format!("Gateway {eui}"));
        let plan = self
            .frequency_plan
            .unwrap_or_else(|| settings.default_frequency_plan.clone());

        let mut desired = DesiredState::new(DeviceIdentity::new(device_id, eui), owner, name, plan)?;

        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                let location =
                    AntennaLocation::new(latitude, longitude, self.altitude.unwrap_or(0.0))?;
                desired = desired.with_location(location);
            }
            (None, None) => {}
            _ => {
                return Err(TetherError::invalid(format!(
                    "gateway {eui}: latitude and longitude must be given together"
                )))
            }
        }

        for request in presets::requested_credentials(
            self.generate_lns_key,
            self.generate_cups_key,
            &settings.key_label_prefix,
            today,
        ) {
            desired = desired.with_credential(request);
        }

        if let Some(organization_id) = self.audit_org_id {
            desired = desired.with_audit(AuditReference {
                organization_id,
                site_id: self.audit_site_id,
            });
        }

        Ok(desired)
    }
}

/// Parse batch file contents into gateway specs plus owner defaults
pub fn parse_batch(contents: &str) -> Result<(OwnerDefaults, Vec<GatewaySpec>)> {
    let value: Value = serde_json::from_str(contents)?;
    if value.get("gateway_eui").is_some() {
        let spec: GatewaySpec = serde_json::from_value(value)?;
        return Ok((OwnerDefaults::default(), vec![spec]));
    }
    let file: BatchFile = serde_json::from_value(value)?;
    if file.gateways.is_empty() {
        return Err(TetherError::invalid("batch file lists no gateways"));
    }
    Ok((file.owner, file.gateways))
}

/// Load a batch file and resolve every entry
pub async fn load_batch(
    path: &Path,
    settings: &ProvisionSettings,
    today: NaiveDate,
) -> Result<Vec<DesiredState>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let (owner, specs) = parse_batch(&contents)?;
    specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            spec.into_desired(&owner, settings, today).map_err(|e| {
                TetherError::invalid(format!("{} entry {}: {e}", path.display(), index + 1))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tether_core::CredentialKind;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn test_file_owner_applies_unless_overridden() {
        let (owner, specs) = parse_batch(
            r#"{
                "owner_id": "cold-chain",
                "owner_type": "org",
                "gateways": [
                    {"gateway_eui": "00:80:00:00:A0:00:09:EF", "name": "Walk-in"},
                    {"gateway_eui": "0080000000000002", "owner_id": "tech-1", "owner_type": "user"}
                ]
            }"#,
        )
        .unwrap();
        let settings = ProvisionSettings::default();

        let first = specs[0].clone().into_desired(&owner, &settings, today()).unwrap();
        assert_eq!(first.owner, Owner::organization("cold-chain"));
        assert_eq!(first.identity.device_id.as_str(), "gw-a00009ef");
        assert_eq!(first.display_name, "Walk-in");

        let second = specs[1].clone().into_desired(&owner, &settings, today()).unwrap();
        assert_eq!(second.owner, Owner::user("tech-1"));
    }

    #[test]
    fn test_single_gateway_file() {
        let (_, specs) = parse_batch(
            r#"{"gateway_eui": "00800000A00009EF", "owner_id": "ops", "generate_cups_key": true}"#,
        )
        .unwrap();
        let desired = specs[0]
            .clone()
            .into_desired(&OwnerDefaults::default(), &ProvisionSettings::default(), today())
            .unwrap();
        let kinds: Vec<_> = desired.credentials.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CredentialKind::Lns, CredentialKind::Cups]);
        assert_eq!(desired.frequency_plan, "US_902_928_FSB_2");
    }

    #[test]
    fn test_missing_owner_is_invalid() {
        let result = GatewaySpec::new("00800000A00009EF").into_desired(
            &OwnerDefaults::default(),
            &ProvisionSettings::default(),
            today(),
        );
        assert_matches!(result, Err(TetherError::Invalid { .. }));
    }

    #[test]
    fn test_half_a_location_is_invalid() {
        let mut spec = GatewaySpec::new("00800000A00009EF");
        spec.owner_id = Some("ops".into());
        spec.latitude = Some(44.9);
        let result =
            spec.into_desired(&OwnerDefaults::default(), &ProvisionSettings::default(), today());
        assert_matches!(result, Err(TetherError::Invalid { .. }));
    }

    #[test]
    fn test_audit_reference_from_entry() {
        let mut spec = GatewaySpec::new("00800000A00009EF");
        spec.owner_id = Some("ops".into());
        spec.audit_org_id = Some("org-1".into());
        spec.audit_site_id = Some("site-2".into());
        spec.generate_lns_key = false;
        let desired = spec
            .into_desired(&OwnerDefaults::default(), &ProvisionSettings::default(), today())
            .unwrap();
        assert_eq!(desired.audit.unwrap().site_id.as_deref(), Some("site-2"));
        assert!(desired.credentials.is_empty());
    }

    #[test]
    fn test_legacy_audit_keys_are_accepted() {
        let (owner, specs) = parse_batch(
            r#"{
                "owner_id": "ops",
                "gateways": [
                    {"gateway_eui": "00800000A00009EF", "fg_org_id": "org-1", "fg_site_id": "site-9"}
                ]
            }"#,
        )
        .unwrap();
        let desired = specs[0]
            .clone()
            .into_desired(&owner, &ProvisionSettings::default(), today())
            .unwrap();
        let audit = desired.audit.unwrap();
        assert_eq!(audit.organization_id, "org-1");
        assert_eq!(audit.site_id.as_deref(), Some("site-9"));
    }

    #[test]
    fn test_owner_id_with_path_characters_is_invalid() {
        let mut spec = GatewaySpec::new("00800000A00009EF");
        spec.owner_id = Some("ops/../gateways".into());
        let result =
            spec.into_desired(&OwnerDefaults::default(), &ProvisionSettings::default(), today());
        assert_matches!(result, Err(TetherError::Invalid { .. }));
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(parse_batch(r#"{"owner_id": "ops", "gateways": []}"#).is_err());
    }

    #[tokio::test]
    async fn test_load_batch_names_bad_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(
            &path,
            r#"{"owner_id": "ops", "gateways": [{"gateway_eui": "00800000A00009EF"}, {"gateway_eui": "nothex"}]}"#,
        )
        .unwrap();

        let err = load_batch(&path, &ProvisionSettings::default(), today())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("entry 2"));
    }
}
