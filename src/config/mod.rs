//! config
//!
//! Configuration loading.
//!
//! # Locations
//!
//! Searched in order, first hit wins:
//! 1. `$CHAINCALL_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/chaincall/config.toml`
//! 3. `~/.chaincall/config.toml`
//!
//! Missing files are not an error; defaults apply.
//!
//! # Environment
//!
//! `CHAINCALL_SECRET_KEY` and `CHAINCALL_PUBLIC_KEY` override the keys in
//! the file.
//!
//! The library never loads configuration on its own. The binary reads it
//! once and constructs the client and cache explicitly.

pub mod schema;

pub use schema::{CacheConfig, FileConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::cache::DEFAULT_FRESHNESS;
use crate::resource::{Credentials, DEFAULT_HOST, DEFAULT_VERSION};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CHAINCALL_CONFIG";

/// Environment variable overriding the secret key.
pub const SECRET_KEY_ENV: &str = "CHAINCALL_SECRET_KEY";

/// Environment variable overriding the public key.
pub const PUBLIC_KEY_ENV: &str = "CHAINCALL_PUBLIC_KEY";

/// Default cache namespace.
pub const DEFAULT_NAMESPACE: &str = "chaincall";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    File,
}

/// Loaded configuration with defaults applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    file: FileConfig,
    path: Option<PathBuf>,
}

impl Config {
    /// Load from the standard locations and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_key_overrides(
            std::env::var(SECRET_KEY_ENV).ok(),
            std::env::var(PUBLIC_KEY_ENV).ok(),
        );
        Ok(config)
    }

    /// Load a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Build from already-parsed values.
    pub fn from_file_config(file: FileConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self { file, path: None })
    }

    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("chaincall/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        let path = dirs::home_dir()?.join(".chaincall/config.toml");
        path.exists().then_some(path)
    }

    /// Replace keys with non-empty override values.
    pub fn apply_key_overrides(&mut self, secret: Option<String>, public: Option<String>) {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.file.secret_key = Some(secret);
        }
        if let Some(public) = public.filter(|s| !s.is_empty()) {
            self.file.public_key = Some(public);
        }
    }

    /// Path of the loaded file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file(&self) -> &FileConfig {
        &self.file
    }

    pub fn host(&self) -> &str {
        self.file.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn version(&self) -> &str {
        self.file.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.file.secret_key.clone(), self.file.public_key.clone())
    }

    /// Schema document path. Relative paths resolve against the config
    /// file's directory.
    pub fn schema_path(&self) -> Option<PathBuf> {
        let path = self.file.schema_path.as_ref()?;
        if path.is_relative() {
            if let Some(dir) = self.path.as_deref().and_then(Path::parent) {
                return Some(dir.join(path));
            }
        }
        Some(path.clone())
    }

    pub fn forum(&self) -> Option<&str> {
        self.file.forum.as_deref()
    }

    fn cache(&self) -> Option<&CacheConfig> {
        self.file.cache.as_ref()
    }

    pub fn cache_namespace(&self) -> &str {
        self.cache()
            .and_then(|c| c.namespace.as_deref())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn cache_backend(&self) -> CacheBackendKind {
        match self.cache().and_then(|c| c.backend.as_deref()) {
            Some("memory") => CacheBackendKind::Memory,
            _ => CacheBackendKind::File,
        }
    }

    /// Directory for the file backend, `~/.chaincall/cache` by default.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = self.cache().and_then(|c| c.dir.clone()) {
            return Ok(dir);
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".chaincall/cache"))
    }

    pub fn freshness(&self) -> Duration {
        self.cache()
            .and_then(|c| c.freshness_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FRESHNESS)
    }

    pub fn single_flight(&self) -> bool {
        self.cache().and_then(|c| c.single_flight).unwrap_or(true)
    }
}
