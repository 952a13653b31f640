//! schema::node
//!
//! Schema tree nodes and required-parameter declarations.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Method;
use serde_json::{Map, Value};

use super::SchemaError;

/// Shared node returned for every undeclared path.
static UNDEFINED: SchemaNode = SchemaNode {
    children: BTreeMap::new(),
    required: Vec::new(),
    method: None,
    declared: false,
};

/// A required parameter declaration, `name` or `name:type`.
///
/// Presence checks compare only [`name`](Self::name); the type tag is kept
/// for display and for callers that want stricter validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredParam {
    name: String,
    type_tag: Option<String>,
}

impl RequiredParam {
    /// Parse a declaration such as `author_email:string`.
    ///
    /// Returns `None` when the name part is empty.
    pub fn parse(declaration: &str) -> Option<Self> {
        let (name, type_tag) = split_type_suffix(declaration);
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            type_tag: type_tag.map(str::to_string),
        })
    }

    /// Parameter name without any type suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type tag, if any.
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }
}

impl fmt::Display for RequiredParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_tag {
            Some(tag) => write!(f, "{}:{}", self.name, tag),
            None => f.write_str(&self.name),
        }
    }
}

/// Split `name:type` into its parts. Only the first `:` separates.
pub(crate) fn split_type_suffix(declaration: &str) -> (&str, Option<&str>) {
    match declaration.split_once(':') {
        Some((name, tag)) => (name, Some(tag)),
        None => (declaration, None),
    }
}

/// One node of the endpoint tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    children: BTreeMap<String, SchemaNode>,
    required: Vec<RequiredParam>,
    method: Option<Method>,
    declared: bool,
}

impl Default for SchemaNode {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            required: Vec::new(),
            method: None,
            declared: true,
        }
    }
}

impl SchemaNode {
    /// The shared undefined node.
    pub fn undefined() -> &'static SchemaNode {
        &UNDEFINED
    }

    /// Whether this node appears in the loaded document.
    pub fn is_declared(&self) -> bool {
        self.declared
    }

    /// Required parameters declared for this endpoint.
    pub fn required(&self) -> &[RequiredParam] {
        &self.required
    }

    /// Declared HTTP method.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Declared child, if present.
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }

    /// Child by name, or the undefined node.
    pub fn child(&self, name: &str) -> &SchemaNode {
        self.children.get(name).unwrap_or(&UNDEFINED)
    }

    /// Walk a dot-separated path relative to this node.
    pub fn descendant(&self, dotted: &str) -> &SchemaNode {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .fold(self, |node, segment| node.child(segment))
    }

    /// Names of declared children, sorted.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub(super) fn collect_endpoints(&self, prefix: &mut Vec<String>, out: &mut Vec<String>) {
        if self.method.is_some() && !prefix.is_empty() {
            out.push(prefix.join("."));
        }
        for (name, child) in &self.children {
            prefix.push(name.clone());
            child.collect_endpoints(prefix, out);
            prefix.pop();
        }
    }

    pub(super) fn from_json(map: &Map<String, Value>, path: &str) -> Result<Self, SchemaError> {
        let mut node = SchemaNode::default();

        for (key, value) in map {
            match key.as_str() {
                "required" => node.required = parse_required(value, path)?,
                "method" => node.method = parse_method(value, path)?,
                _ => match value {
                    Value::Object(child) => {
                        let child_path = if path.is_empty() {
                            key.clone()
                        } else {
                            format!("{}.{}", path, key)
                        };
                        let parsed = SchemaNode::from_json(child, &child_path)?;
                        node.children.insert(key.clone(), parsed);
                    }
                    _ => {
                        tracing::trace!(path, attribute = %key, "ignoring schema attribute");
                    }
                },
            }
        }

        Ok(node)
    }
}

fn invalid(path: &str, message: impl Into<String>) -> SchemaError {
    SchemaError::InvalidDeclaration {
        path: path.to_string(),
        message: message.into(),
    }
}

fn parse_required(value: &Value, path: &str) -> Result<Vec<RequiredParam>, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(path, "'required' must be an array of strings"))?;

    items
        .iter()
        .map(|item| {
            let decl = item
                .as_str()
                .ok_or_else(|| invalid(path, "'required' entries must be strings"))?;
            RequiredParam::parse(decl)
                .ok_or_else(|| invalid(path, format!("empty parameter name in '{}'", decl)))
        })
        .collect()
}

fn parse_method(value: &Value, path: &str) -> Result<Option<Method>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Method::from_bytes(s.to_ascii_uppercase().as_bytes())
            .map(Some)
            .map_err(|_| invalid(path, format!("invalid HTTP method '{}'", s))),
        _ => Err(invalid(path, "'method' must be a string")),
    }
}
