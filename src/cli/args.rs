//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--config <path>`: Use this config file instead of the search locations
//! - `--schema <path>`: Use this schema document instead of the configured one
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chaincall - schema-driven API client with a cache-aside store
#[derive(Parser, Debug)]
#[command(name = "chaincall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Endpoint schema document (JSON)
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Invoke an endpoint and print the JSON result
    #[command(after_help = "\
EXAMPLES:
    # Declared endpoint, method comes from the schema
    chaincall call threads.details -p forum=myforum -p thread=link:https://example.com/post

    # Undeclared endpoint, method supplied explicitly
    chaincall call users.details --method GET -p user=123

    # Repeat a key to send a multi-valued parameter
    chaincall call posts.list -p thread=42 -p related=thread -p related=forum")]
    Call {
        /// Dot-separated endpoint name (e.g. threads.details)
        endpoint: String,

        /// Parameter as KEY=VALUE; repeat a key for multiple values
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// HTTP method, overriding the schema
        #[arg(long)]
        method: Option<String>,

        /// API version, overriding the config
        #[arg(long = "api-version")]
        api_version: Option<String>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Show the declared schema for an endpoint, or list all endpoints
    Schema {
        /// Dot-separated endpoint name
        endpoint: Option<String>,
    },

    /// Inspect or seed the cache store
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Fetch the comments for a page link, served from cache while fresh
    Thread {
        /// Canonical page URL
        link: String,

        /// Forum short name, overriding the config
        #[arg(long)]
        forum: Option<String>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Fetch the latest posts in a forum, served from cache while fresh
    Recent {
        /// Forum short name, overriding the config
        #[arg(long)]
        forum: Option<String>,

        /// Number of posts to request (default 10)
        #[arg(long)]
        limit: Option<u32>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Comment on the thread for a page link
    #[command(after_help = "\
EXAMPLES:
    chaincall post https://example.com/post --name Ada --email ada@example.com --message 'Nice post'

    # Reply to an existing post, posting with a different public key
    chaincall post https://example.com/post --name Ada --email ada@example.com \\
        --message 'Agreed' --parent 123 --api-key PUBLIC_KEY")]
    Post {
        /// Canonical page URL
        link: String,

        /// Forum short name, overriding the config
        #[arg(long)]
        forum: Option<String>,

        /// Author display name
        #[arg(long)]
        name: String,

        /// Author email
        #[arg(long)]
        email: String,

        /// Comment text
        #[arg(long)]
        message: String,

        /// Id of the post being replied to
        #[arg(long)]
        parent: Option<String>,

        /// Public key to post with instead of the configured one
        #[arg(long = "api-key")]
        api_key: Option<String>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Cache subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print one entry
    Get {
        /// Table name
        table: String,
        /// Entry id
        id: String,
    },

    /// Print every entry in a table
    List {
        /// Table name
        table: String,
    },

    /// Store a JSON value
    Put {
        /// Table name
        table: String,
        /// Entry id
        id: String,
        /// JSON value
        value: String,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
