//! Authenticated JSON client shared by every HTTP handler
//!
//! Every call yields a [`RemoteResponse`]; nothing here returns an error once
//! the client is built. Requests that never get an HTTP response map to
//! status `0` with `{"error": ..}`, empty bodies to `{}`, and bodies that are
//! not JSON to `{"raw": ..}` with `ok = false`.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tether_core::{AccessToken, HttpConfig, RemoteResponse, Result, TetherError};
use zeroize::Zeroizing;

/// JSON client carrying a bearer token on every request
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
}

fn sensitive_header(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| TetherError::config("credential contains characters not allowed in a header"))?;
    header.set_sensitive(true);
    Ok(header)
}

impl ApiClient {
    /// Client authenticating with `token`
    pub fn new(token: &AccessToken, config: &HttpConfig) -> Result<Self> {
        Self::with_headers(token, config, HeaderMap::new())
    }

    /// Client authenticating with `token` and sending `extra` on every request
    pub fn with_headers(
        token: &AccessToken,
        config: &HttpConfig,
        extra: HeaderMap,
    ) -> Result<Self> {
        let bearer = Zeroizing::new(format!("Bearer {}", token.expose()));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, sensitive_header(&bearer)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.extend(extra);

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| TetherError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Header carrying a secret, hidden from debug output
    pub fn secret_header(name: &'static str, value: &AccessToken) -> Result<(HeaderName, HeaderValue)> {
        Ok((HeaderName::from_static(name), sensitive_header(value.expose())?))
    }

    /// GET
    pub async fn get(&self, url: &str) -> RemoteResponse {
        self.send(Method::GET, url, None).await
    }

    /// POST with a JSON body
    pub async fn post(&self, url: &str, body: &Value) -> RemoteResponse {
        self.send(Method::POST, url, Some(body)).await
    }

    /// PUT with a JSON body
    pub async fn put(&self, url: &str, body: &Value) -> RemoteResponse {
        self.send(Method::PUT, url, Some(body)).await
    }

    /// DELETE
    pub async fn delete(&self, url: &str) -> RemoteResponse {
        self.send(Method::DELETE, url, None).await
    }

    /// Send one request and normalize whatever comes back
    pub async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> RemoteResponse {
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%method, url, error = %e, "request failed without response");
                return RemoteResponse::transport_error(e.to_string());
            }
        };

        let status = response.status();
        tracing::debug!(%method, url, status = status.as_u16(), "remote call");
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return RemoteResponse::failure(
                    status.as_u16(),
                    json!({ "error": format!("unreadable body: {e}") }),
                )
            }
        };

        normalize(status.as_u16(), status.is_success(), &text)
    }
}

fn normalize(status: u16, success: bool, text: &str) -> RemoteResponse {
    if text.trim().is_empty() {
        return RemoteResponse {
            status,
            body: json!({}),
            ok: success,
        };
    }
    match serde_json::from_str::<Value>(text) {
        Ok(body) => RemoteResponse {
            status,
            body,
            ok: success,
        },
        Err(_) => RemoteResponse::failure(status, json!({ "raw": text })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_empty_object() {
        let response = normalize(204, true, "");
        assert!(response.ok);
        assert_eq!(response.body, json!({}));
    }

    #[test]
    fn test_non_json_body_is_not_ok() {
        let response = normalize(200, true, "<html>maintenance</html>");
        assert!(!response.ok);
        assert_eq!(response.body["raw"], "<html>maintenance</html>");
    }

    #[test]
    fn test_error_status_keeps_body() {
        let response = normalize(409, false, r#"{"code":6}"#);
        assert!(!response.ok);
        assert_eq!(response.status, 409);
        assert_eq!(response.body["code"], 6);
    }
}
