//! Run log persistence
//!
//! The log is written once, at the end of a run, as pretty JSON named
//! `<device_id>_<operation>_log.json`.

use std::path::PathBuf;
use tether_core::{Result, RunLog, TetherError};

/// Writes finished run logs into a directory
#[derive(Debug, Clone)]
pub struct RunLogWriter {
    dir: PathBuf,
}

impl RunLogWriter {
    /// Writer rooted at `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist one log and return its path
    pub async fn persist(&self, log: &RunLog) -> Result<PathBuf> {
        let json = log.to_json_pretty()?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TetherError::storage(format!("{}: {e}", self.dir.display())))?;
        let path = self.dir.join(log.file_name());
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| TetherError::storage(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), steps = log.total(), "run log saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{DeviceId, RunOperation, StepName, StepOutcome, Topology};

    #[tokio::test]
    async fn test_persist_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RunLogWriter::new(dir.path().join("logs"));
        let mut log = RunLog::new(
            DeviceId::new("gw-a00009ef").unwrap(),
            RunOperation::Deprovision,
            Topology::default(),
        );
        log.record(StepOutcome::succeeded(StepName::Check, "registered"));
        log.finish();

        let path = writer.persist(&log).await.unwrap();

        assert!(path.ends_with("gw-a00009ef_deprovision_log.json"));
        let parsed: RunLog =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, log);
    }
}
