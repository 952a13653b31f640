//! resource
//!
//! Schema-driven remote resource client.
//!
//! # Architecture
//!
//! Callers address an endpoint by descending through named segments from
//! the client's root resource, then invoke it:
//!
//! ```text
//! client.root() -> .descend("threads") -> .descend("details") -> .invoke(params)
//! ```
//!
//! Invocation resolves the accumulated path against the
//! [`SchemaRegistry`], validates required parameters, assembles the call
//! with [`RequestBuilder`], sends it through a [`Transport`] and parses the
//! envelope into an [`ApiResponse`].
//!
//! # Modules
//!
//! - `params`: ordered call parameters
//! - `request`: pure request assembly
//! - `response`: envelope parsing, [`ResultPage`]
//! - `transport`: the [`Transport`] trait and [`HttpTransport`]
//! - [`mock`]: call-counting transport for tests
//!
//! # Example
//!
//! ```ignore
//! use chaincall::resource::{Client, Credentials, HttpTransport, Params};
//! use chaincall::schema::SchemaRegistry;
//! use std::sync::Arc;
//!
//! let client = Client::new(
//!     Credentials::new(Some(secret), Some(public)),
//!     Arc::new(SchemaRegistry::load(path)?),
//!     Arc::new(HttpTransport::new()?),
//! );
//!
//! let thread = client
//!     .resource("threads.details")
//!     .invoke(Params::new().with("forum", "myforum").with("thread", "link:https://example.com/post"))
//!     .await?;
//! ```

mod error;
pub mod mock;
mod params;
mod request;
mod response;
mod transport;

pub use error::ClientError;
pub use params::{ParamValue, Params};
pub use request::{
    encode_pairs, is_read_style, PreparedRequest, RequestBuilder, FORM_CONTENT_TYPE,
    USER_AGENT_VALUE,
};
pub use response::{parse_response, ApiResponse, RawResponse, ResultPage};
pub use transport::{HttpTransport, Transport};

use std::fmt;
use std::sync::Arc;

use crate::schema::{SchemaNode, SchemaRegistry};

/// Default API host.
pub const DEFAULT_HOST: &str = "https://disqus.com";

/// Default API version.
pub const DEFAULT_VERSION: &str = "3.0";

/// API keys used for credential injection.
///
/// Empty strings are treated as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    secret_key: Option<String>,
    public_key: Option<String>,
}

// Keys are never printed.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("has_secret_key", &self.secret_key.is_some())
            .field("has_public_key", &self.public_key.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn new(secret_key: Option<String>, public_key: Option<String>) -> Self {
        Self {
            secret_key: secret_key.filter(|k| !k.is_empty()),
            public_key: public_key.filter(|k| !k.is_empty()),
        }
    }

    /// Write-capable key.
    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    /// Read-capable key.
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }
}

/// Entry point for resource resolution.
///
/// Immutable after construction; share it by reference or `Arc`.
pub struct Client {
    host: String,
    version: String,
    credentials: Credentials,
    registry: Arc<SchemaRegistry>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("version", &self.version)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl Client {
    /// Create a client against [`DEFAULT_HOST`] and [`DEFAULT_VERSION`].
    pub fn new(
        credentials: Credentials,
        registry: Arc<SchemaRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        if credentials.public_key().is_none() {
            tracing::warn!("no public key configured; public-scope calls will be unauthenticated");
        }
        Self {
            host: DEFAULT_HOST.to_string(),
            version: DEFAULT_VERSION.to_string(),
            credentials,
            registry,
            transport,
        }
    }

    /// Use a different API host (scheme included).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Use a different default API version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The root resource. It cannot be invoked without an endpoint.
    pub fn root(&self) -> Resource<'_> {
        Resource {
            client: self,
            node: self.registry.root(),
            path: Vec::new(),
        }
    }

    /// Resolve a sequence of segments from the root.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Resource<'_> {
        segments
            .iter()
            .fold(self.root(), |res, seg| res.descend(seg.as_ref()))
    }

    /// Resolve a dot-separated endpoint such as `threads.details`.
    pub fn resource(&self, dotted: &str) -> Resource<'_> {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .fold(self.root(), |res, seg| res.descend(seg))
    }

    fn builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.host, &self.version, &self.credentials)
    }
}

/// An addressable point in the endpoint tree.
///
/// Created by descending from [`Client::root`]; cheap to create and meant
/// to be discarded after one invocation.
#[derive(Debug, Clone)]
pub struct Resource<'a> {
    client: &'a Client,
    node: &'a SchemaNode,
    path: Vec<String>,
}

impl<'a> Resource<'a> {
    /// Extend the path by one segment.
    pub fn descend(&self, name: &str) -> Resource<'a> {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Resource {
            client: self.client,
            node: self.node.child(name),
            path,
        }
    }

    /// Segments from the root to here.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dot-joined registry key.
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }

    /// Schema for this path (the undefined node if never declared).
    pub fn schema(&self) -> &'a SchemaNode {
        self.node
    }

    /// Invoke the endpoint at this path.
    pub async fn invoke(&self, params: Params) -> Result<ApiResponse, ClientError> {
        if self.path.is_empty() {
            return Err(ClientError::Configuration(
                "you cannot call the API without a resource".into(),
            ));
        }
        self.execute(&self.path.join("/"), self.node, params).await
    }

    /// Invoke `endpoint` relative to this resource.
    ///
    /// The whole string is looked up as a single child key of this node's
    /// schema, so `"threads.details"` is not walked through `threads`. Its
    /// dotted name becomes the outbound path as-is.
    pub async fn invoke_endpoint(
        &self,
        endpoint: &str,
        params: Params,
    ) -> Result<ApiResponse, ClientError> {
        if endpoint.split('.').all(str::is_empty) {
            return Err(ClientError::Configuration("empty endpoint name".into()));
        }
        let node = self.node.child(endpoint);
        self.execute(&endpoint.replace('.', "/"), node, params).await
    }

    async fn execute(
        &self,
        endpoint: &str,
        node: &SchemaNode,
        params: Params,
    ) -> Result<ApiResponse, ClientError> {
        let param_count = params.len();
        let request = self.client.builder().build(endpoint, node, params)?;

        tracing::debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            declared = node.is_declared(),
            params = param_count,
            "issuing request"
        );

        let raw = self.client.transport.send(request).await?;
        let result = parse_response(raw);

        if let Err(ref e) = result {
            tracing::debug!(endpoint, error = %e, "request failed");
        }
        result
    }
}
