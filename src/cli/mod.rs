//! cli
//!
//! Command-line interface layer for chaincall.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration once and hand it to command handlers
//! - Install the log subscriber when debugging
//!
//! The library modules never read configuration or the environment; this
//! layer does it for them.

pub mod args;
pub mod commands;

pub use args::{CacheAction, Cli, Command, Shell};

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::ui::output::Verbosity;

/// Shared state for command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration
    pub config: Config,
    /// Schema override from `--schema`
    pub schema: Option<PathBuf>,
    /// Output verbosity
    pub verbosity: Verbosity,
}

impl Context {
    /// Schema document to load: the flag wins over the config.
    pub fn schema_path(&self) -> Option<PathBuf> {
        self.schema.clone().or_else(|| self.config.schema_path())
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.debug);

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_key_overrides(
                std::env::var(crate::config::SECRET_KEY_ENV).ok(),
                std::env::var(crate::config::PUBLIC_KEY_ENV).ok(),
            );
            config
        }
        None => Config::load().context("Failed to load config")?,
    };

    let ctx = Context {
        config,
        schema: cli.schema.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr when `--debug` is given or `RUST_LOG` is set.
fn init_logging(debug: bool) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if debug => EnvFilter::new("chaincall=debug"),
        Err(_) => return,
    };

    // A second init (tests calling run twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
