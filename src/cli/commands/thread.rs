//! thread command - Comments for a page, served from cache while fresh
//!
//! Resolves the page link to a thread with `threads.details`, then reads the
//! thread's posts through the freshness policy under table [`COMMENT_TABLE`]
//! keyed by thread id. The thread lookup itself is never cached.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::cache::{CacheRead, Clock, FreshnessPolicy, KvBackend};
use crate::cli::Context;
use crate::resource::{ApiResponse, Client, ClientError, Params};
use crate::ui::output::{self, Verbosity};

/// Cache table holding post lists by thread id.
pub const COMMENT_TABLE: &str = "Comment";

/// Print the comments for `link`.
pub fn thread(ctx: &Context, link: &str, forum: Option<&str>, pretty: bool) -> Result<()> {
    let forum = require_forum(ctx, forum)?;

    let client = super::build_client(ctx)?;
    let store = Arc::new(super::open_store(ctx)?);
    let policy = super::build_policy(ctx, Arc::clone(&store));

    let rt = tokio::runtime::Runtime::new()?;
    let read = rt.block_on(thread_comments(&client, &policy, forum, link))?;
    rt.block_on(store.close())?;

    if ctx.verbosity == Verbosity::Debug {
        let source = if read.is_hit() { "cache" } else { "upstream" };
        eprintln!("served from {} (stored at {})", source, read.entry.timestamp);
    }
    output::print(output::format_json(read.data(), pretty), ctx.verbosity);
    Ok(())
}

/// Resolve `link` to a thread and read its posts cache-aside.
pub async fn thread_comments<B: KvBackend, C: Clock>(
    client: &Client,
    policy: &FreshnessPolicy<B, C>,
    forum: &str,
    link: &str,
) -> Result<CacheRead<Value>, ClientError> {
    let id = resolve_thread(client, forum, link).await?;

    let thread = id.as_str();
    policy
        .read(COMMENT_TABLE, &id, move || async move {
            let posts = client
                .resource("posts.list")
                .invoke(
                    Params::new()
                        .with("method", "GET")
                        .with("forum", forum)
                        .with("thread", thread),
                )
                .await?;
            Ok(posts.to_value())
        })
        .await
}

/// Thread id for a page link, via `threads.details`.
pub(crate) async fn resolve_thread(
    client: &Client,
    forum: &str,
    link: &str,
) -> Result<String, ClientError> {
    let details = client
        .resource("threads.details")
        .invoke(
            Params::new()
                .with("method", "GET")
                .with("forum", forum)
                .with("thread", format!("link:{}", link)),
        )
        .await?;
    thread_id(&details)
        .ok_or_else(|| ClientError::Decode(format!("no thread id for link '{}'", link)))
}

/// Thread id from a `threads.details` result. Ids may be strings or numbers.
fn thread_id(details: &ApiResponse) -> Option<String> {
    match details.as_scalar()?.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Forum from the flag, falling back to the config.
pub(crate) fn require_forum<'a>(ctx: &'a Context, forum: Option<&'a str>) -> Result<&'a str> {
    forum.or_else(|| ctx.config.forum()).ok_or_else(|| {
        anyhow!("No forum given. Pass --forum or set `forum` in the config file.")
    })
}
