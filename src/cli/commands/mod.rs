//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Builds the client or cache store it needs from the [`Context`]
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that touch the network or the cache are async internally. Each
//! handler creates a runtime and blocks on its async body, so dispatch
//! stays synchronous.

mod cache_cmd;
mod call;
mod completion;
mod post;
mod recent;
mod schema_cmd;
mod thread;

pub use cache_cmd::cache;
pub use call::{call, parse_params};
pub use completion::{completion, write_completion};
pub use post::{create_post, post, NewPost};
pub use recent::{recent, recent_posts, DEFAULT_RECENT_LIMIT, RECENT_ID, RECENT_TABLE};
pub use schema_cmd::schema;
pub use thread::{thread, thread_comments, COMMENT_TABLE};

use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::cache::{CacheStore, FileBackend, FreshnessPolicy, KvBackend, MemoryBackend};
use crate::config::CacheBackendKind;
use crate::resource::{Client, HttpTransport, Transport};
use crate::schema::SchemaRegistry;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Call {
            endpoint,
            params,
            method,
            api_version,
            pretty,
        } => call(
            ctx,
            &endpoint,
            &params,
            method.as_deref(),
            api_version.as_deref(),
            pretty,
        ),
        Command::Schema { endpoint } => schema(ctx, endpoint.as_deref()),
        Command::Cache { action } => cache(ctx, action),
        Command::Thread {
            link,
            forum,
            pretty,
        } => thread(ctx, &link, forum.as_deref(), pretty),
        Command::Recent {
            forum,
            limit,
            pretty,
        } => recent(ctx, forum.as_deref(), limit, pretty),
        Command::Post {
            link,
            forum,
            name,
            email,
            message,
            parent,
            api_key,
            pretty,
        } => {
            let new_post = NewPost {
                author_name: name,
                author_email: email,
                message,
                parent,
                api_key,
            };
            post(ctx, &link, forum.as_deref(), &new_post, pretty)
        }
        Command::Completion { shell } => completion(shell),
    }
}

/// Load the schema registry named by the flag or config.
///
/// Without one, the registry is empty and every call needs an explicit
/// method.
pub(crate) fn load_registry(ctx: &Context) -> Result<SchemaRegistry> {
    match ctx.schema_path() {
        Some(path) => SchemaRegistry::load(&path)
            .with_context(|| format!("Failed to load schema from {}", path.display())),
        None => {
            tracing::debug!("no schema configured, using empty registry");
            Ok(SchemaRegistry::empty())
        }
    }
}

/// Build a client over the given transport.
pub(crate) fn build_client_with(ctx: &Context, transport: Arc<dyn Transport>) -> Result<Client> {
    let registry = load_registry(ctx)?;
    Ok(Client::new(ctx.config.credentials(), Arc::new(registry), transport)
        .with_host(ctx.config.host())
        .with_version(ctx.config.version()))
}

/// Build a client over HTTP.
pub(crate) fn build_client(ctx: &Context) -> Result<Client> {
    let transport = HttpTransport::new().context("Failed to create HTTP client")?;
    build_client_with(ctx, Arc::new(transport))
}

/// Open the configured cache backend.
pub(crate) fn open_backend(ctx: &Context) -> Result<Box<dyn KvBackend>> {
    let backend: Box<dyn KvBackend> = match ctx.config.cache_backend() {
        CacheBackendKind::Memory => Box::new(MemoryBackend::new()),
        CacheBackendKind::File => Box::new(FileBackend::new(ctx.config.cache_dir()?)),
    };
    Ok(backend)
}

/// Open the configured cache store.
pub(crate) fn open_store(ctx: &Context) -> Result<CacheStore<Box<dyn KvBackend>>> {
    Ok(CacheStore::new(
        open_backend(ctx)?,
        ctx.config.cache_namespace(),
    ))
}

/// Wrap a store in the configured freshness policy.
pub(crate) fn build_policy<B: KvBackend>(
    ctx: &Context,
    store: Arc<CacheStore<B>>,
) -> FreshnessPolicy<B> {
    FreshnessPolicy::new(store)
        .with_threshold(ctx.config.freshness())
        .with_single_flight(ctx.config.single_flight())
}
