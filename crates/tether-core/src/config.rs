//! Tether configuration
//!
//! Loaded from TOML (missing file means defaults), then overridden from
//! `TETHER_*` environment variables, then validated. Secrets are never read
//! from the file.

use crate::topology::Topology;
use crate::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default frequency plan (US 915 MHz, sub-band 2)
pub const DEFAULT_FREQUENCY_PLAN: &str = "US_902_928_FSB_2";

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "TETHER_";

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout
    pub connect_timeout_secs: u64,
    /// User agent sent to both clusters
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: crate::TOOL_VERSION.to_string(),
        }
    }
}

impl HttpConfig {
    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Provisioning behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionSettings {
    /// Frequency plan used when the caller gives none
    pub default_frequency_plan: String,
    /// Prefix of derived device identifiers
    pub device_id_prefix: String,
    /// Prefix of credential labels
    pub key_label_prefix: String,
    /// Directory receiving key files
    pub output_dir: PathBuf,
    /// Directory receiving run logs
    pub log_dir: PathBuf,
    /// Pause before querying the radio plane after registry changes
    pub propagation_delay_ms: u64,
    /// Per-run deadline checked before each step
    pub run_deadline_secs: Option<u64>,
    /// Devices processed at once in batch mode
    pub batch_concurrency: usize,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            default_frequency_plan: DEFAULT_FREQUENCY_PLAN.to_string(),
            device_id_prefix: "gw".to_string(),
            key_label_prefix: "Tether".to_string(),
            output_dir: PathBuf::from("."),
            log_dir: PathBuf::from("."),
            propagation_delay_ms: 1000,
            run_deadline_secs: None,
            batch_concurrency: 4,
        }
    }
}

impl ProvisionSettings {
    /// Propagation pause as a duration
    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }

    /// Run deadline as a duration
    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }
}

/// Audit store endpoint; the service key comes from the environment only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Base URL of the audit store REST endpoint
    pub url: String,
    /// Table receiving gateway rows
    #[serde(default = "default_audit_table")]
    pub table: String,
}

fn default_audit_table() -> String {
    "gateways".to_string()
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Fixed two-cluster topology
    pub topology: Topology,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Provisioning behaviour
    pub provision: ProvisionSettings,
    /// Optional audit store
    pub audit: Option<AuditConfig>,
}

impl TetherConfig {
    /// Load from a TOML file, apply environment overrides and validate.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TetherError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TETHER_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `TETHER_*` overrides from an arbitrary lookup
    pub fn merge_with_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(url) = var("IDENTITY_BASE_URL") {
            self.topology.identity_base_url = url;
        }
        if let Some(url) = var("RADIO_PLANE_BASE_URL") {
            self.topology.radio_plane_base_url = url;
        }
        if let Some(host) = var("RADIO_PLANE_HOST") {
            self.topology.radio_plane_host = host;
        }
        if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = secs.parse().map_err(|_| {
                TetherError::config(format!("Invalid timeout in {ENV_PREFIX}REQUEST_TIMEOUT_SECS"))
            })?;
        }
        if let Some(dir) = var("OUTPUT_DIR") {
            self.provision.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("LOG_DIR") {
            self.provision.log_dir = PathBuf::from(dir);
        }
        if let Some(url) = var("AUDIT_URL") {
            match self.audit.as_mut() {
                Some(audit) => audit.url = url,
                None => {
                    self.audit = Some(AuditConfig {
                        url,
                        table: default_audit_table(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;
        if self.http.request_timeout_secs == 0 {
            return Err(TetherError::config("request_timeout_secs must be positive"));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(TetherError::config("connect_timeout_secs must be positive"));
        }
        if self.provision.batch_concurrency == 0 {
            return Err(TetherError::config("batch_concurrency must be at least 1"));
        }
        if self.provision.device_id_prefix.is_empty() {
            return Err(TetherError::config("device_id_prefix must not be empty"));
        }
        if let Some(audit) = &self.audit {
            if !(audit.url.starts_with("https://") || audit.url.starts_with("http://")) {
                return Err(TetherError::config(format!(
                    "audit url must be an http(s) URL, got '{}'",
                    audit.url
                )));
            }
        }
        Ok(())
    }
}
