//! # Tether Transport
//!
//! Production handlers for the effect traits in `tether-core`:
//!
//! - [`HttpGatewayBackend`]: identity registry and radio-plane REST calls
//! - [`PostgrestAuditStore`]: audit row upserts
//!
//! No decision logic lives here. Remote outcomes are normalized into
//! `RemoteResponse` values and handed back unchanged.

#![forbid(unsafe_code)]

pub mod audit;
pub mod backend;
pub mod client;

pub use audit::PostgrestAuditStore;
pub use backend::{HttpGatewayBackend, GATEWAY_FIELD_MASK};
pub use client::ApiClient;
