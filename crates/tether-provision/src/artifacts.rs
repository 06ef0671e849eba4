//! Key files in the Basics Station format
//!
//! One file per issued credential, `<dir>/<device_id>_<kind>.key`, holding the
//! single line `Authorization: Bearer <secret>\r\n`. Files are owner-only on
//! Unix. The rendered contents are zeroized once written.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tether_core::{
    ArtifactEffects, CredentialKind, DeviceId, IssuedCredential, Result, TetherError,
};
use tokio::io::AsyncWriteExt;
use zeroize::Zeroizing;

/// Writes each credential to its own key file
#[derive(Debug, Clone)]
pub struct KeyFileWriter {
    dir: PathBuf,
}

impl KeyFileWriter {
    /// Writer rooted at `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the key file for one credential kind
    pub fn path_for(&self, device_id: &DeviceId, kind: CredentialKind) -> PathBuf {
        self.dir
            .join(format!("{device_id}_{}.key", kind.as_str()))
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> TetherError {
    TetherError::storage(format!("{}: {err}", path.display()))
}

#[async_trait]
impl ArtifactEffects for KeyFileWriter {
    async fn write_credential(
        &self,
        device_id: &DeviceId,
        credential: &IssuedCredential,
    ) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error(&self.dir, e))?;

        let path = self.path_for(device_id, credential.kind);
        let contents = Zeroizing::new(format!(
            "Authorization: Bearer {}\r\n",
            credential.secret.expose()
        ));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&path).await.map_err(|e| storage_error(&path, e))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| storage_error(&path, e))?;
        file.flush().await.map_err(|e| storage_error(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| storage_error(&path, e))?;
        }

        tracing::info!(key_id = %credential.id, path = %path.display(), "key file written");
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::RightSet;

    fn credential(kind: CredentialKind) -> IssuedCredential {
        IssuedCredential::from_body(
            kind,
            RightSet::new(["RIGHT_GATEWAY_LINK"]),
            &json!({"id": "KEY0001", "key": "NNSXS.TESTSECRET"}),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_writes_station_key_format() {
        let dir = tempfile::tempdir().unwrap();
        let writer = KeyFileWriter::new(dir.path().join("keys"));
        let device_id = DeviceId::new("gw-a00009ef").unwrap();

        let location = writer
            .write_credential(&device_id, &credential(CredentialKind::Lns))
            .await
            .unwrap();

        let path = writer.path_for(&device_id, CredentialKind::Lns);
        assert_eq!(location, path.display().to_string());
        assert!(path.ends_with("gw-a00009ef_lns.key"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Authorization: Bearer NNSXS.TESTSECRET\r\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let writer = KeyFileWriter::new(dir.path());
        let device_id = DeviceId::new("gw-a00009ef").unwrap();
        writer
            .write_credential(&device_id, &credential(CredentialKind::Cups))
            .await
            .unwrap();

        let path = writer.path_for(&device_id, CredentialKind::Cups);
        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let writer = KeyFileWriter::new(&blocker);
        let device_id = DeviceId::new("gw-a00009ef").unwrap();

        let err = writer
            .write_credential(&device_id, &credential(CredentialKind::Lns))
            .await
            .unwrap_err();
        assert!(matches!(err, TetherError::Storage { .. }));
    }
}
