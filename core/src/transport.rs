use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::errors::TransportError;

/// Raw HTTP outcome handed back to the dispatcher for classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound wire seam between the dispatcher and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `url` and return the status and body text.
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.without_url().to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
