//! HTTP transport for mirror sync requests
//!
//! The sync endpoint only needs one kind of request: an empty-bodied PUT
//! whose status and body are inspected. [`HttpTransport`] abstracts that
//! request so the timeout and error handling in the client can be tested
//! against a fake; [`ReqwestTransport`] is the production implementation.

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Transport-level failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HttpError {
    /// The request could not be sent or the response could not be read
    #[error("{0}")]
    Transport(String),

    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Build(String),
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Returns true for statuses in [200, 300)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends sync requests to the mirror
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a PUT with an empty body and `content-length: 0`
    async fn put_empty(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

/// [`HttpTransport`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .user_agent(concat!("mirror-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create a transport around an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn put_empty(&self, url: &str) -> Result<HttpResponse, HttpError> {
        debug!(url = url, "Sending HTTP PUT request");

        let response = self
            .client
            .put(url)
            .header(CONTENT_LENGTH, "0")
            .body(Vec::new())
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        debug!(url = url, status = status, body_size = body.len(), "Received response");

        Ok(HttpResponse { status, body })
    }
}
