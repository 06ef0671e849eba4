//! Gateway identifiers
//!
//! A gateway is addressed by two values: the registry-scoped `DeviceId`
//! chosen by the operator and the hardware `DeviceEui` printed on the label.
//! Both are validated on construction and immutable afterwards.

use crate::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const REGISTRY_ID_MIN_LEN: usize = 2;
const REGISTRY_ID_MAX_LEN: usize = 36;

/// Registry id rules shared by gateways, users and organizations
pub(crate) fn check_registry_id(what: &str, raw: &str) -> Result<()> {
    let len = raw.len();
    if !(REGISTRY_ID_MIN_LEN..=REGISTRY_ID_MAX_LEN).contains(&len) {
        return Err(TetherError::invalid(format!(
            "{what} '{raw}' must be {REGISTRY_ID_MIN_LEN}-{REGISTRY_ID_MAX_LEN} characters"
        )));
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(TetherError::invalid(format!(
            "{what} '{raw}' may only contain lower-case letters, digits and '-'"
        )));
    }
    if raw.starts_with('-') || raw.ends_with('-') {
        return Err(TetherError::invalid(format!(
            "{what} '{raw}' must not start or end with '-'"
        )));
    }
    Ok(())
}

/// Registry identifier of a gateway (`gateway_id` on the wire)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap a gateway identifier.
    ///
    /// Accepts 2-36 characters of lower-case ASCII letters, digits and `-`,
    /// not starting or ending with `-`.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        check_registry_id("device id", &raw)?;
        Ok(Self(raw))
    }

    /// Derive the conventional identifier `<prefix>-<last 8 EUI hex digits>`.
    pub fn derive_from_eui(prefix: &str, eui: &DeviceEui) -> Result<Self> {
        let hex = eui.to_hex_lower();
        Self::new(format!("{prefix}-{}", &hex[hex.len() - 8..]))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = TetherError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// 64-bit hardware identifier of a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceEui([u8; 8]);

impl DeviceEui {
    /// Parse an EUI from 16 hex characters.
    ///
    /// Label separators (`:`, `-`, spaces) are ignored and case is not significant.
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | ' '))
            .collect();
        if cleaned.len() != 16 {
            return Err(TetherError::invalid(format!(
                "EUI '{raw}' must be exactly 16 hex characters"
            )));
        }
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(&cleaned, &mut bytes)
            .map_err(|e| TetherError::invalid(format!("EUI '{raw}' is not hex: {e}")))?;
        Ok(Self(bytes))
    }

    /// Raw EUI bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    fn to_hex_lower(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for DeviceEui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for DeviceEui {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceEui {
    type Error = TetherError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DeviceEui> for String {
    fn from(eui: DeviceEui) -> Self {
        eui.to_string()
    }
}

/// Immutable identity pair supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Registry identifier
    pub device_id: DeviceId,
    /// Hardware identifier
    pub eui: DeviceEui,
}

impl DeviceIdentity {
    /// Pair an identifier with its hardware EUI
    pub fn new(device_id: DeviceId, eui: DeviceEui) -> Self {
        Self { device_id, eui }
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            failure_persistence: None,
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn derived_ids_are_always_valid(bytes in any::<[u8; 8]>(), colons in any::<bool>()) {
            let upper = hex::encode_upper(bytes);
            let label = if colons {
                upper
                    .as_bytes()
                    .chunks(2)
                    .map(|pair| String::from_utf8_lossy(pair).into_owned())
                    .collect::<Vec<_>>()
                    .join(":")
            } else {
                upper.clone()
            };

            let eui = DeviceEui::parse(&label).unwrap();
            prop_assert_eq!(eui.to_string(), upper);

            let id = DeviceId::derive_from_eui("gw", &eui).unwrap();
            prop_assert!(id.as_str().starts_with("gw-"));
            prop_assert_eq!(DeviceId::new(id.as_str().to_string()).unwrap(), id);
        }
    }
}
