//! PostgREST audit store
//!
//! Upserts into `<url>/<table>` with `on_conflict=organization_id,gateway_eui`
//! and merge-duplicates resolution, authenticated with a service key sent as
//! both `apikey` and bearer token.

use crate::client::ApiClient;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tether_core::{
    AccessToken, AuditConfig, AuditEffects, AuditRecord, HttpConfig, Result, TetherError,
};

/// Columns identifying a gateway row
pub const CONFLICT_COLUMNS: &str = "organization_id,gateway_eui";

/// Audit store backed by a PostgREST endpoint
#[derive(Debug, Clone)]
pub struct PostgrestAuditStore {
    client: ApiClient,
    table_url: String,
}

impl PostgrestAuditStore {
    /// Store for the configured endpoint and table
    pub fn new(config: &AuditConfig, service_key: &AccessToken, http: &HttpConfig) -> Result<Self> {
        if !(config.url.starts_with("https://") || config.url.starts_with("http://")) {
            return Err(TetherError::config(format!(
                "audit url must be an http(s) URL, got '{}'",
                config.url
            )));
        }
        let mut headers = HeaderMap::new();
        let (name, value) = ApiClient::secret_header("apikey", service_key)?;
        headers.insert(name, value);
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("resolution=merge-duplicates"),
        );

        Ok(Self {
            client: ApiClient::with_headers(service_key, http, headers)?,
            table_url: format!("{}/{}", config.url.trim_end_matches('/'), config.table),
        })
    }
}

#[async_trait]
impl AuditEffects for PostgrestAuditStore {
    async fn upsert_gateway(&self, record: &AuditRecord) -> Result<()> {
        let url = format!("{}?on_conflict={CONFLICT_COLUMNS}", self.table_url);
        let body = serde_json::to_value(record)?;
        let response = self.client.post(&url, &body).await;
        if response.ok {
            tracing::debug!(
                organization_id = %record.organization_id,
                gateway_eui = %record.gateway_eui,
                "audit row upserted"
            );
            Ok(())
        } else {
            Err(response.to_error())
        }
    }
}
