//! schema command - Show declared endpoints

use anyhow::{bail, Result};

use crate::cli::Context;
use crate::schema::{SchemaNode, SchemaRegistry};
use crate::ui::output;

/// List every endpoint, or describe one.
pub fn schema(ctx: &Context, endpoint: Option<&str>) -> Result<()> {
    let registry = super::load_registry(ctx)?;
    let text = render(&registry, endpoint)?;
    output::print(text, ctx.verbosity);
    Ok(())
}

/// Text shown for `endpoint`, or the endpoint list when `None`.
pub(crate) fn render(registry: &SchemaRegistry, endpoint: Option<&str>) -> Result<String> {
    let Some(endpoint) = endpoint else {
        let endpoints = registry.endpoints();
        if endpoints.is_empty() {
            return Ok("No endpoints declared.".to_string());
        }
        return Ok(output::format_list(&endpoints, ""));
    };

    let node = registry.lookup_dotted(endpoint);
    if !node.is_declared() {
        bail!("Endpoint '{}' is not declared in the schema", endpoint);
    }
    Ok(describe(endpoint, node))
}

fn describe(endpoint: &str, node: &SchemaNode) -> String {
    let mut lines = vec![endpoint.to_string()];

    if let Some(method) = node.method() {
        lines.push(format!("  method: {}", method));
    }
    if !node.required().is_empty() {
        lines.push("  required:".to_string());
        lines.push(output::format_list(node.required(), "    "));
    }
    let children: Vec<&str> = node.children().collect();
    if !children.is_empty() {
        lines.push("  children:".to_string());
        lines.push(output::format_list(&children, "    "));
    }

    lines.join("\n")
}
