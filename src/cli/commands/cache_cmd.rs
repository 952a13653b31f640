//! cache command - Inspect or seed the cache store

use anyhow::{bail, Context as _, Result};
use serde_json::{Map, Value};

use crate::cache::{CacheStore, KvBackend};
use crate::cli::args::CacheAction;
use crate::cli::Context;
use crate::ui::output;

/// Run a cache subcommand against the configured store.
pub fn cache(ctx: &Context, action: CacheAction) -> Result<()> {
    let store = super::open_store(ctx)?;
    let rt = tokio::runtime::Runtime::new()?;

    let result = rt.block_on(run_action(&store, action));
    rt.block_on(store.close())?;

    if let Some(text) = result? {
        output::print(text, ctx.verbosity);
    }
    Ok(())
}

/// Execute `action`, returning the text to show.
pub(crate) async fn run_action<B: KvBackend>(
    store: &CacheStore<B>,
    action: CacheAction,
) -> Result<Option<String>> {
    match action {
        CacheAction::Get { table, id } => {
            let value: Option<Value> = store.get(&table, &id).await?;
            match value {
                Some(value) => Ok(Some(output::format_json(&value, true))),
                None => bail!("No cache entry for {}.{}", table, id),
            }
        }
        CacheAction::List { table } => {
            let mut entries: Vec<(String, Value)> = store.entries(&table).await?;
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let map: Map<String, Value> = entries.into_iter().collect();
            Ok(Some(output::format_json(&Value::Object(map), true)))
        }
        CacheAction::Put { table, id, value } => {
            let value: Value = serde_json::from_str(&value)
                .with_context(|| format!("Value for {}.{} is not valid JSON", table, id))?;
            store.put(&table, &id, &value).await?;
            Ok(Some(format!("Stored {}", store.key(&table, &id))))
        }
    }
}
