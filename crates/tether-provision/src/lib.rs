//! # Tether Provision
//!
//! State machines that keep a gateway's registry record, credentials and
//! radio-plane session consistent across two clusters.
//!
//! - [`Reconciler`]: converge a gateway on its desired state, idempotently
//! - [`CredentialIssuer`]: issue scoped keys and hand each secret to one artifact
//! - [`Deprovisioner`]: soft delete, optional purge, confirmation
//! - [`StatusReporter`]: read-only drift report
//!
//! All of them are generic over the effect traits in `tether-core`, so the
//! same logic runs against HTTP in production and the testkit backend in
//! tests. None of them return errors: every remote failure is a step outcome
//! in the returned report.

#![forbid(unsafe_code)]

pub mod artifacts;
pub mod batch;
pub mod credentials;
pub mod deprovision;
pub mod persist;
pub mod reconciler;
pub mod status;

pub use artifacts::KeyFileWriter;
pub use batch::{BatchEntry, BatchRunner};
pub use credentials::{CredentialIssuer, Issuance};
pub use deprovision::{DeprovisionOptions, DeprovisionOutcome, DeprovisionReport, Deprovisioner};
pub use persist::RunLogWriter;
pub use reconciler::{ProvisionReport, ReconcileState, Reconciler, ReconcilerOptions};
pub use status::{
    Connectivity, CredentialListing, PointerCheck, Registration, StatusReport, StatusReporter,
};
