//! Issued credentials
//!
//! A credential secret is revealed once by the registry. It lives only in
//! [`IssuedCredential`], which is neither `Serialize` nor `Display`, has a
//! redacted `Debug`, and zeroizes its secret on drop. Everything that outlives
//! the issuing step is a [`CredentialReceipt`].

use crate::desired::{CredentialKind, RightSet};
use crate::{Result, TetherError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use zeroize::Zeroizing;

/// Single-reveal secret value
pub struct CredentialSecret(Zeroizing<String>);

impl CredentialSecret {
    /// Wrap a secret value
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Expose the secret to an artifact writer
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialSecret(<redacted>)")
    }
}

/// A credential as returned by the registry, secret included
#[derive(Debug)]
pub struct IssuedCredential {
    /// Registry identifier of the key
    pub id: String,
    /// Purpose of the key
    pub kind: CredentialKind,
    /// Rights granted
    pub rights: RightSet,
    /// Secret value
    pub secret: CredentialSecret,
}

impl IssuedCredential {
    /// Parse the `{"id", "key"}` body returned by key creation
    pub fn from_body(kind: CredentialKind, rights: RightSet, body: &Value) -> Result<Self> {
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TetherError::serialization("credential response has no id"))?;
        let key = body
            .get("key")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                TetherError::serialization(format!("credential {id} response has no key"))
            })?;
        Ok(Self {
            id: id.to_string(),
            kind,
            rights,
            secret: CredentialSecret::new(key),
        })
    }

    /// Secret-free summary of this credential
    pub fn receipt(&self, artifact: Option<String>) -> CredentialReceipt {
        CredentialReceipt {
            id: self.id.clone(),
            kind: self.kind,
            rights: self.rights.clone(),
            artifact,
        }
    }
}

/// Secret-free record of an issued credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialReceipt {
    /// Registry identifier of the key
    pub id: String,
    /// Purpose of the key
    pub kind: CredentialKind,
    /// Rights granted
    pub rights: RightSet,
    /// Where the secret was persisted, if the write succeeded
    pub artifact: Option<String>,
}

/// Bearer token used to authenticate against both clusters
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a token, rejecting blank values
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TetherError::config("API token is empty"));
        }
        Ok(Self(Zeroizing::new(token.trim().to_string())))
    }

    /// Expose the token for an authorization header
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}
