// Shared setup for every subcommand

use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tether_core::{AccessToken, AuditEffects, RunLog, TetherConfig};
use tether_provision::{KeyFileWriter, Reconciler, ReconcilerOptions, RunLogWriter};
use tether_transport::{HttpGatewayBackend, PostgrestAuditStore};

/// Environment variable holding the registry API token
pub const API_TOKEN_ENV: &str = "TETHER_API_TOKEN";
/// Environment variable holding the audit store service key
pub const AUDIT_KEY_ENV: &str = "TETHER_AUDIT_SERVICE_KEY";

/// Everything a command needs to talk to both clusters
pub struct Context {
    /// Loaded and validated configuration
    pub config: TetherConfig,
    /// Registry and radio-plane client
    pub backend: Arc<HttpGatewayBackend>,
    /// Run log destination
    pub logs: RunLogWriter,
}

impl Context {
    /// Load configuration and build the HTTP backend.
    ///
    /// The token comes from `--api-token` or `TETHER_API_TOKEN`; without one
    /// nothing can be done.
    pub fn load(config_path: &Path, api_token: Option<String>) -> anyhow::Result<Self> {
        let config = TetherConfig::load(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;

        let token = api_token
            .or_else(|| std::env::var(API_TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty())
            .with_context(|| format!("no API token: pass --api-token or set {API_TOKEN_ENV}"))?;
        let token = AccessToken::new(token)?;

        let backend = HttpGatewayBackend::new(&token, config.topology.clone(), &config.http)?;
        let logs = RunLogWriter::new(config.provision.log_dir.clone());

        Ok(Self {
            config,
            backend: Arc::new(backend),
            logs,
        })
    }

    /// Reconciler writing key files to `output_dir`, or the configured directory
    pub fn reconciler(
        &self,
        output_dir: Option<PathBuf>,
    ) -> anyhow::Result<Reconciler<HttpGatewayBackend>> {
        let dir = output_dir.unwrap_or_else(|| self.config.provision.output_dir.clone());
        let mut reconciler = Reconciler::new(
            Arc::clone(&self.backend),
            self.config.topology.clone(),
            Arc::new(KeyFileWriter::new(dir)),
        )
        .with_options(ReconcilerOptions::from_settings(&self.config.provision));

        if let Some(audit) = self.audit_store()? {
            reconciler = reconciler.with_audit(audit);
        }
        Ok(reconciler)
    }

    fn audit_store(&self) -> anyhow::Result<Option<Arc<dyn AuditEffects>>> {
        let Some(audit) = &self.config.audit else {
            return Ok(None);
        };
        let key = match std::env::var(AUDIT_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => AccessToken::new(key)?,
            _ => {
                tracing::warn!(
                    "audit store configured but {AUDIT_KEY_ENV} is not set; audit rows will be skipped"
                );
                return Ok(None);
            }
        };
        let store = PostgrestAuditStore::new(audit, &key, &self.config.http)?;
        Ok(Some(Arc::new(store)))
    }

    /// Persist a run log, warning instead of failing the command
    pub async fn persist(&self, log: &RunLog) -> Option<PathBuf> {
        match self.logs.persist(log).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "could not write run log");
                None
            }
        }
    }
}
