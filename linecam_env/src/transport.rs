//! Transport abstraction for the remote line store.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TransportError;

/// Request/response access to the backend that stores songs and lines.
///
/// Paths are relative to the transport's base (e.g. `/song?id=3`). Every
/// method fails with [`TransportError::Status`] when the server reports a
/// non-success status; bodies are returned as raw text.
///
/// # Implementations
///
/// - **Production**: [`HttpTransport`](crate::HttpTransport) on `reqwest`
/// - **Tests**: in-memory fakes that record requests
#[async_trait]
pub trait LineTransport: Send + Sync + 'static {
    /// Issues a GET and returns the response body.
    async fn get(&self, path: &str) -> Result<String, TransportError>;

    /// Issues a POST with an optional JSON body and returns the response body.
    async fn post(&self, path: &str, json_body: Option<String>) -> Result<String, TransportError>;

    /// Issues a POST with a url-encoded form body and returns the response body.
    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<String, TransportError>;

    /// Issues a PUT with a JSON body and returns the response body.
    async fn put(&self, path: &str, json_body: String) -> Result<String, TransportError>;
}

/// Typed JSON helpers layered over any [`LineTransport`].
#[async_trait]
pub trait TransportExt: LineTransport {
    /// GETs `path` and parses the body as `T`.
    async fn get_json<T>(&self, path: &str) -> Result<T, TransportError>
    where
        T: DeserializeOwned + Send,
    {
        let body = self.get(path).await?;
        serde_json::from_str(&body).map_err(TransportError::decode)
    }

    /// POSTs `body` serialized as JSON.
    async fn post_json<B>(&self, path: &str, body: &B) -> Result<String, TransportError>
    where
        B: Serialize + Sync,
    {
        let encoded = serde_json::to_string(body).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.post(path, Some(encoded)).await
    }

    /// PUTs `body` serialized as JSON.
    async fn put_json<B>(&self, path: &str, body: &B) -> Result<String, TransportError>
    where
        B: Serialize + Sync,
    {
        let encoded = serde_json::to_string(body).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.put(path, encoded).await
    }
}

impl<T: LineTransport + ?Sized> TransportExt for T {}
