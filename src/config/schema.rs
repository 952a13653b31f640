//! config::schema
//!
//! Configuration file types.
//!
//! # Validation
//!
//! Values are validated after parsing so a bad host or an empty namespace is
//! reported at startup rather than on the first call.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Top-level configuration file.
///
/// # Example
///
/// ```toml
/// host = "https://disqus.com"
/// version = "3.0"
/// secret_key = "..."
/// public_key = "..."
/// schema_path = "/etc/chaincall/interfaces.json"
/// forum = "myforum"
///
/// [cache]
/// namespace = "blog"
/// backend = "file"
/// freshness_secs = 10
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// API host including scheme
    pub host: Option<String>,

    /// Default API version
    pub version: Option<String>,

    /// Write-capable key
    pub secret_key: Option<String>,

    /// Read-capable key
    pub public_key: Option<String>,

    /// Endpoint schema document
    pub schema_path: Option<PathBuf>,

    /// Forum short name used by thread lookups
    pub forum: Option<String>,

    /// Cache settings
    pub cache: Option<CacheConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(host) = &self.host {
            if !(host.starts_with("http://") || host.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "host '{}' must start with http:// or https://",
                    host
                )));
            }
        }

        if let Some(version) = &self.version {
            if version.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "version cannot be empty".to_string(),
                ));
            }
        }

        if let Some(cache) = &self.cache {
            cache.validate()?;
        }

        Ok(())
    }
}

/// Cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Key namespace
    pub namespace: Option<String>,

    /// Backend ("memory" or "file")
    pub backend: Option<String>,

    /// Directory for the file backend
    pub dir: Option<PathBuf>,

    /// Maximum entry age in seconds
    pub freshness_secs: Option<u64>,

    /// Coalesce concurrent cold reads of one key
    pub single_flight: Option<bool>,
}

impl CacheConfig {
    /// Valid backend names.
    pub const VALID_BACKENDS: &'static [&'static str] = &["memory", "file"];

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ns) = &self.namespace {
            if ns.is_empty() || ns.contains(':') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid cache namespace '{}': must be non-empty and contain no ':'",
                    ns
                )));
            }
        }

        if let Some(backend) = &self.backend {
            if !Self::VALID_BACKENDS.contains(&backend.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid cache backend '{}', must be one of: {}",
                    backend,
                    Self::VALID_BACKENDS.join(", ")
                )));
            }
        }

        Ok(())
    }
}
