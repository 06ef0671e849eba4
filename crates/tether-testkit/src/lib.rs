//! Tether Testing Infrastructure
//!
//! In-memory handlers for every effect trait in `tether-core`, plus fixtures
//! shared by the state-machine and adapter test suites.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tether_testkit::*;
//!
//! let backend = MockGatewayBackend::new();
//! backend.seed_gateway(&test_identity().device_id, TEST_EUI, Some(STALE_POINTER));
//! backend.script(Operation::RegisterGateway, failure(409));
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod artifacts;
pub mod backend;
pub mod fixtures;

pub use artifacts::{MemoryAuditStore, RecordingArtifactWriter, WrittenArtifact};
pub use backend::{MockGatewayBackend, Operation, RecordedCall};
pub use fixtures::*;

use serde_json::json;
use tether_core::RemoteResponse;

/// A scripted non-success response with a registry-style error body
pub fn failure(status: u16) -> RemoteResponse {
    RemoteResponse::failure(
        status,
        json!({ "code": status, "message": format!("scripted failure {status}") }),
    )
}
