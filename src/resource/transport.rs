//! resource::transport
//!
//! The seam between request assembly and the network.
//!
//! A [`Transport`] issues exactly one call per [`PreparedRequest`]. It does
//! not retry, refresh credentials, or interpret the body beyond returning
//! status and text; envelope parsing happens in
//! [`parse_response`](super::response::parse_response).

use async_trait::async_trait;
use reqwest::Client;

use super::error::ClientError;
use super::request::PreparedRequest;
use super::response::RawResponse;

/// Issues prepared requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return its status and body.
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, ClientError>;
}

/// `reqwest`-backed transport.
///
/// Idle connections are not kept between calls, so every invocation opens
/// its own connection. No timeout is set beyond `reqwest`'s defaults.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with connection reuse disabled.
    pub fn new() -> Result<Self, ClientError> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, ClientError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}
