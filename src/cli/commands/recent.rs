//! recent command - Latest posts across a forum, served from cache while fresh
//!
//! Lists posts with `forums.listPosts` and keeps the result under table
//! [`RECENT_TABLE`], id [`RECENT_ID`]. There is one entry per store, so a
//! different `limit` inside the freshness window still gets the cached list.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::cache::{CacheRead, Clock, FreshnessPolicy, KvBackend};
use crate::cli::Context;
use crate::resource::{Client, ClientError, Params};
use crate::ui::output::{self, Verbosity};

/// Cache table holding the recent-posts list.
pub const RECENT_TABLE: &str = "Recent";

/// Id of the single entry in [`RECENT_TABLE`].
pub const RECENT_ID: &str = "comment";

/// Posts requested when no limit is given.
pub const DEFAULT_RECENT_LIMIT: u32 = 10;

/// Print the most recent posts in the forum.
pub fn recent(ctx: &Context, forum: Option<&str>, limit: Option<u32>, pretty: bool) -> Result<()> {
    let forum = super::thread::require_forum(ctx, forum)?;

    let client = super::build_client(ctx)?;
    let store = Arc::new(super::open_store(ctx)?);
    let policy = super::build_policy(ctx, Arc::clone(&store));

    let rt = tokio::runtime::Runtime::new()?;
    let read = rt.block_on(recent_posts(&client, &policy, forum, limit))?;
    rt.block_on(store.close())?;

    if ctx.verbosity == Verbosity::Debug {
        let source = if read.is_hit() { "cache" } else { "upstream" };
        eprintln!("served from {} (stored at {})", source, read.entry.timestamp);
    }
    output::print(output::format_json(read.data(), pretty), ctx.verbosity);
    Ok(())
}

/// Read the forum's latest posts cache-aside.
pub async fn recent_posts<B: KvBackend, C: Clock>(
    client: &Client,
    policy: &FreshnessPolicy<B, C>,
    forum: &str,
    limit: Option<u32>,
) -> Result<CacheRead<Value>, ClientError> {
    let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).to_string();
    let limit = limit.as_str();
    policy
        .read(RECENT_TABLE, RECENT_ID, move || async move {
            let posts = client
                .resource("forums.listPosts")
                .invoke(
                    Params::new()
                        .with("method", "GET")
                        .with("forum", forum)
                        .with("limit", limit),
                )
                .await?;
            Ok(posts.to_value())
        })
        .await
}
