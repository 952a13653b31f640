//! post command - Create a comment on the thread for a page link

use anyhow::Result;
use serde_json::Value;

use crate::cli::Context;
use crate::resource::{Client, ClientError, Params};
use crate::ui::output;

/// A comment to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    /// Id of the post being replied to. Sent empty for a top-level comment.
    pub parent: Option<String>,
    /// Public key to post with instead of the configured one.
    pub api_key: Option<String>,
}

/// Create `post` on the thread for `link` and print the created post.
pub fn post(
    ctx: &Context,
    link: &str,
    forum: Option<&str>,
    new_post: &NewPost,
    pretty: bool,
) -> Result<()> {
    let forum = super::thread::require_forum(ctx, forum)?;
    let client = super::build_client(ctx)?;

    let rt = tokio::runtime::Runtime::new()?;
    let created = rt.block_on(create_post(&client, forum, link, new_post))?;

    output::print(output::format_json(&created, pretty), ctx.verbosity);
    Ok(())
}

/// Resolve `link` to a thread and call `posts.create` on it.
///
/// A caller-supplied `api_key` replaces the configured public key for this
/// call only. Nothing is cached.
pub async fn create_post(
    client: &Client,
    forum: &str,
    link: &str,
    new_post: &NewPost,
) -> Result<Value, ClientError> {
    let thread = super::thread::resolve_thread(client, forum, link).await?;

    let mut params = Params::new()
        .with("method", "POST")
        .with("thread", thread)
        .with("author_email", new_post.author_email.as_str())
        .with("author_name", new_post.author_name.as_str())
        .with("message", new_post.message.as_str())
        .with("parent", new_post.parent.as_deref().unwrap_or_default());
    if let Some(key) = &new_post.api_key {
        params.set("api_key", key.as_str());
    }

    let created = client.resource("posts.create").invoke(params).await?;
    Ok(created.to_value())
}
