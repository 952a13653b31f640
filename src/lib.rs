//! chaincall - schema-driven API client with a cache-aside store
//!
//! Callers address remote endpoints by chaining names
//! (`client.root().descend("threads").descend("details")`) and invoke them
//! with keyword parameters. A JSON schema document declares, per endpoint,
//! the HTTP method and the required parameters; calls are validated against
//! it before anything goes on the wire.
//!
//! Results can be kept in a namespaced key-value cache and served from it
//! while younger than a freshness threshold.
//!
//! # Architecture
//!
//! - [`schema`] - Endpoint schema loading and lookup
//! - [`resource`] - Client, resource resolution, request assembly, transport
//! - [`cache`] - Namespaced cache store, backends, freshness policy
//! - [`config`] - Configuration file loading and validation
//! - [`cli`] - Command-line interface layer
//! - [`ui`] - User-facing output
//!
//! # Invariants
//!
//! 1. A call with a missing required parameter never reaches the transport
//! 2. The schema is immutable after load; undeclared paths resolve to a
//!    shared undefined node
//! 3. A failed fetch never writes to the cache
//! 4. Credentials are never logged

pub mod cache;
pub mod cli;
pub mod config;
pub mod resource;
pub mod schema;
pub mod ui;
