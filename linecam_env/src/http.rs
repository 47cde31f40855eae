//! Production transport backed by `reqwest`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::LineTransport;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL of the line store (default: http://localhost:3000)
    pub base_url: String,

    /// Per-request timeout in milliseconds (default: 5000)
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// HTTP implementation of [`LineTransport`].
///
/// JSON requests carry `Content-Type: application/json`, form posts
/// `application/x-www-form-urlencoded`. Any non-success status fails.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: reqwest::Url,
}

impl HttpTransport {
    /// Creates a transport for the configured base URL.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base = reqwest::Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| TransportError::network(e.to_string()))?;

        Ok(Self { client, base })
    }

    fn resolve(&self, path: &str) -> Result<reqwest::Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn execute(&self, request: reqwest::RequestBuilder, url: &reqwest::Url) -> Result<String, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "transport response");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| TransportError::network(e.to_string()))
    }
}

#[async_trait]
impl LineTransport for HttpTransport {
    async fn get(&self, path: &str) -> Result<String, TransportError> {
        let url = self.resolve(path)?;
        let request = self.client.get(url.clone());
        self.execute(request, &url).await
    }

    async fn post(&self, path: &str, json_body: Option<String>) -> Result<String, TransportError> {
        let url = self.resolve(path)?;
        let mut request = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = json_body {
            request = request.body(body);
        }
        self.execute(request, &url).await
    }

    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<String, TransportError> {
        let url = self.resolve(path)?;
        let request = self.client.post(url.clone()).form(fields);
        self.execute(request, &url).await
    }

    async fn put(&self, path: &str, json_body: String) -> Result<String, TransportError> {
        let url = self.resolve(path)?;
        let request = self
            .client
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(json_body);
        self.execute(request, &url).await
    }
}
