//! schema
//!
//! Declarative endpoint tree: which parameters each endpoint requires and
//! which HTTP method it uses.
//!
//! # Format
//!
//! The registry is loaded once from a JSON document shaped like:
//!
//! ```json
//! {
//!   "threads": {
//!     "details": { "required": ["thread"], "method": "GET" },
//!     "list":    { "method": "GET" }
//!   },
//!   "posts": {
//!     "create": { "required": ["message", "author_email:string"], "method": "POST" }
//!   }
//! }
//! ```
//!
//! `required` and `method` are attributes of the node they appear in; every
//! other key holding an object is a child endpoint.
//!
//! # Unknown endpoints
//!
//! The tree is immutable after loading. Looking up a path that was never
//! declared returns a shared undefined node (no required parameters, no
//! method) instead of inserting one, so concurrent resolutions never write
//! to the registry.
//!
//! # Example
//!
//! ```
//! use chaincall::schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::from_json_str(
//!     r#"{"threads": {"details": {"required": ["thread"], "method": "GET"}}}"#,
//! ).unwrap();
//!
//! let node = registry.lookup(&["threads", "details"]);
//! assert_eq!(node.method().map(|m| m.as_str()), Some("GET"));
//!
//! let unknown = registry.lookup(&["threads", "nope"]);
//! assert!(!unknown.is_declared());
//! assert!(unknown.method().is_none());
//! ```

pub(crate) mod node;

pub use node::{RequiredParam, SchemaNode};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from loading a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse schema: {0}")]
    Parse(String),

    #[error("invalid schema declaration at '{path}': {message}")]
    InvalidDeclaration { path: String, message: String },
}

/// The loaded endpoint tree.
///
/// Cheap to share behind an `Arc`; nothing mutates it after construction.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    root: SchemaNode,
}

impl SchemaRegistry {
    /// A registry with no declared endpoints.
    ///
    /// Every lookup returns the undefined node, so every invocation must
    /// supply its own `method`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a registry from a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value =
            serde_json::from_str(source).map_err(|e| SchemaError::Parse(e.to_string()))?;
        let map = value
            .as_object()
            .ok_or_else(|| SchemaError::Parse("top level must be an object".into()))?;
        let root = SchemaNode::from_json(map, "")?;
        Ok(Self { root })
    }

    /// Load a registry from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let contents = fs::read_to_string(path).map_err(|e| SchemaError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&contents)
    }

    /// The root node (empty path).
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Walk `path` from the root.
    ///
    /// Never fails: undeclared segments resolve to the undefined node.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> &SchemaNode {
        path.iter()
            .fold(&self.root, |node, segment| node.child(segment.as_ref()))
    }

    /// Walk a dot-separated endpoint name such as `threads.details`.
    pub fn lookup_dotted(&self, endpoint: &str) -> &SchemaNode {
        self.root.descendant(endpoint)
    }

    /// Dot-joined names of every endpoint that declares a method.
    pub fn endpoints(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_endpoints(&mut Vec::new(), &mut out);
        out
    }
}
