//! Outbound delivery transport.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Why a POST did not succeed
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint answered with a non-2xx status
    #[error("Failed to send data: status {status}: {body}")]
    Status { status: u16, body: String },

    /// No usable response (DNS, connect, TLS, timeout, ...)
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),
}

impl TransportError {
    /// Whether the endpoint was reached at all
    pub fn is_status(&self) -> bool {
        matches!(self, TransportError::Status { .. })
    }
}

/// JSON POST to an endpoint; `Ok` means a 2xx response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<(), TransportError>;
}
