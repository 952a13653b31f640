//! resource::mock
//!
//! In-memory transport for deterministic testing.
//!
//! # Design
//!
//! `MockTransport` answers from a queue of canned responses (falling back to
//! a default once the queue is empty), records every request it receives,
//! and counts calls. Tests use the count to prove that validation failures
//! never reach the network.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chaincall::resource::mock::MockTransport;
//! use chaincall::resource::{Client, Credentials, Params};
//! use chaincall::schema::SchemaRegistry;
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::new();
//! transport.push_json(200, serde_json::json!({"code": 0, "response": {"id": "7"}}));
//!
//! let client = Client::new(
//!     Credentials::default(),
//!     Arc::new(SchemaRegistry::empty()),
//!     Arc::new(transport.clone()),
//! );
//! let result = client
//!     .resource("threads.details")
//!     .invoke(Params::new().with("method", "GET"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(result.as_scalar().unwrap()["id"], "7");
//! assert_eq!(transport.call_count(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::error::ClientError;
use super::request::PreparedRequest;
use super::response::RawResponse;
use super::transport::Transport;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the client owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    queued: VecDeque<Result<RawResponse, ClientError>>,
    fallback: Option<RawResponse>,
    requests: Vec<PreparedRequest>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a raw response.
    pub fn push(&self, response: RawResponse) {
        self.lock().queued.push_back(Ok(response));
    }

    /// Queue a JSON response.
    pub fn push_json(&self, status: u16, body: Value) {
        self.push(RawResponse::new(status, body.to_string()));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: ClientError) {
        self.lock().queued.push_back(Err(error));
    }

    /// Response returned whenever the queue is empty.
    pub fn set_fallback(&self, response: RawResponse) {
        self.lock().fallback = Some(response);
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.lock().requests.clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<PreparedRequest> {
        self.lock().requests.last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, ClientError> {
        let mut inner = self.lock();
        inner.requests.push(request);
        match inner.queued.pop_front() {
            Some(result) => result,
            None => inner.fallback.clone().ok_or_else(|| {
                ClientError::Transport("mock transport has no response queued".into())
            }),
        }
    }
}
