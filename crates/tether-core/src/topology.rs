//! The fixed two-cluster topology of a run
//!
//! The identity registry and the radio-plane server live in different
//! clusters. The registry record must point at the radio-plane host; that
//! pointer is the one cross-cluster consistency guarantee, so all three values
//! are fixed for the lifetime of a run and injected at construction.

use crate::{Result, TetherError};
use serde::{Deserialize, Serialize};

/// Default identity registry endpoint (global cluster)
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://eu1.cloud.thethings.network";
/// Default radio-plane endpoint (regional cluster)
pub const DEFAULT_RADIO_PLANE_BASE_URL: &str = "https://nam1.cloud.thethings.network";
/// Default value expected in the record's server pointer
pub const DEFAULT_RADIO_PLANE_HOST: &str = "nam1.cloud.thethings.network";

/// Endpoints and expected server pointer for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topology {
    /// Base URL of the identity registry
    pub identity_base_url: String,
    /// Base URL of the radio-plane server
    pub radio_plane_base_url: String,
    /// Host the registry record must point at
    pub radio_plane_host: String,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            radio_plane_base_url: DEFAULT_RADIO_PLANE_BASE_URL.to_string(),
            radio_plane_host: DEFAULT_RADIO_PLANE_HOST.to_string(),
        }
    }
}

impl Topology {
    /// Build a topology from explicit values
    pub fn new(
        identity_base_url: impl Into<String>,
        radio_plane_base_url: impl Into<String>,
        radio_plane_host: impl Into<String>,
    ) -> Result<Self> {
        let topology = Self {
            identity_base_url: identity_base_url.into(),
            radio_plane_base_url: radio_plane_base_url.into(),
            radio_plane_host: radio_plane_host.into(),
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Check that both endpoints are http(s) URLs and the host is a bare host name
    pub fn validate(&self) -> Result<()> {
        for (field, url) in [
            ("identity_base_url", &self.identity_base_url),
            ("radio_plane_base_url", &self.radio_plane_base_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(TetherError::config(format!(
                    "{field} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        let host = self.radio_plane_host.trim();
        if host.is_empty() || host.contains("://") || host.contains('/') {
            return Err(TetherError::config(format!(
                "radio_plane_host must be a bare host name, got '{}'",
                self.radio_plane_host
            )));
        }
        Ok(())
    }

    /// Registry endpoint without a trailing slash
    pub fn identity_base(&self) -> &str {
        self.identity_base_url.trim_end_matches('/')
    }

    /// Radio-plane endpoint without a trailing slash
    pub fn radio_plane_base(&self) -> &str {
        self.radio_plane_base_url.trim_end_matches('/')
    }

    /// Whether an observed server pointer matches the expected host
    pub fn pointer_matches(&self, observed: Option<&str>) -> bool {
        observed == Some(self.radio_plane_host.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology_is_valid() {
        assert!(Topology::default().validate().is_ok());
    }

    #[test]
    fn test_host_must_not_be_url() {
        let result = Topology::new(
            DEFAULT_IDENTITY_BASE_URL,
            DEFAULT_RADIO_PLANE_BASE_URL,
            "https://nam1.cloud.thethings.network",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pointer_matching_is_exact() {
        let topology = Topology::default();
        assert!(topology.pointer_matches(Some(DEFAULT_RADIO_PLANE_HOST)));
        assert!(!topology.pointer_matches(Some("eu1.cloud.thethings.network")));
        assert!(!topology.pointer_matches(None));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let topology = Topology::new("http://127.0.0.1:9000/", "http://127.0.0.1:9001", "rp.local")
            .unwrap();
        assert_eq!(topology.identity_base(), "http://127.0.0.1:9000");
    }
}
