//! Credential issuance
//!
//! Each request becomes exactly one `create_<kind>_key` step. The secret
//! travels from the registry response to one artifact write and is dropped
//! (and zeroized) before the step outcome is built. Only the key id and
//! rights reach the run log.

use serde_json::json;
use tether_core::{
    ArtifactEffects, CredentialReceipt, CredentialRequest, DeviceId, IdentityRegistryEffects,
    IssuedCredential, StepName, StepOutcome,
};

/// Result of one issuance attempt
#[derive(Debug, Clone)]
pub struct Issuance {
    /// Step outcome to append to the run log
    pub outcome: StepOutcome,
    /// Receipt, present whenever the registry issued a key
    pub receipt: Option<CredentialReceipt>,
}

impl Issuance {
    fn failed(outcome: StepOutcome) -> Self {
        Self {
            outcome,
            receipt: None,
        }
    }
}

/// Requests scoped keys from the registry and hands each secret to one artifact writer
pub struct CredentialIssuer<'a, R: ?Sized> {
    registry: &'a R,
    artifacts: &'a dyn ArtifactEffects,
}

impl<'a, R> CredentialIssuer<'a, R>
where
    R: IdentityRegistryEffects + ?Sized,
{
    /// Issuer over a registry and an artifact writer
    pub fn new(registry: &'a R, artifacts: &'a dyn ArtifactEffects) -> Self {
        Self {
            registry,
            artifacts,
        }
    }

    /// Issue one credential. Never re-uses an existing key.
    pub async fn issue(&self, device_id: &DeviceId, request: &CredentialRequest) -> Issuance {
        let step = StepName::CreateKey(request.kind);
        let kind = request.kind;

        if request.rights.is_empty() {
            return Issuance::failed(StepOutcome::failed(
                step,
                format!("{kind} key request names no rights"),
            ));
        }

        let response = self
            .registry
            .create_api_key(device_id, &request.label, &request.rights)
            .await;
        if !response.ok {
            return Issuance::failed(
                StepOutcome::failed(
                    step,
                    format!("{kind} key creation failed {}", response.describe()),
                )
                .with_response(response.body),
            );
        }

        let credential =
            match IssuedCredential::from_body(kind, request.rights.clone(), &response.body) {
                Ok(credential) => credential,
                Err(e) => {
                    return Issuance::failed(StepOutcome::failed(
                        step,
                        format!("{kind} key response unusable: {e}"),
                    ))
                }
            };
        drop(response);

        let summary = json!({ "id": credential.id, "rights": credential.rights });
        match self.artifacts.write_credential(device_id, &credential).await {
            Ok(location) => {
                tracing::debug!(key_id = %credential.id, %location, "credential persisted");
                Issuance {
                    outcome: StepOutcome::succeeded(
                        step,
                        format!("{kind} key {} issued, saved to {location}", credential.id),
                    )
                    .with_response(summary),
                    receipt: Some(credential.receipt(Some(location))),
                }
            }
            Err(e) => Issuance {
                outcome: StepOutcome::failed(
                    step,
                    format!(
                        "{kind} key {} issued but could not be saved ({e}); revoke it in the registry",
                        credential.id
                    ),
                )
                .with_response(summary),
                receipt: Some(credential.receipt(None)),
            },
        }
    }
}
