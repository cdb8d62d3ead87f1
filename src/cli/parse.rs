//! CLI parse: clap types for tinyvcs. No behavior; definitions only.

use crate::sync::RemoteParams;
use crate::tree::TrackingRules;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tinyvcs - snapshot version control with HTTP sync
#[derive(Parser, Debug)]
#[command(name = "tinyvcs")]
#[command(about = "Snapshot-based version control using Merkle trees, synced over HTTP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Working directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path when output is "file"
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Extension and ignore lists supplied on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// Tracked extensions, comma separated or repeated (e.g. --ext .txt,.md)
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Ignored file or directory names, comma separated or repeated
    #[arg(long = "ignore", value_delimiter = ',')]
    pub ignored: Vec<String>,
}

impl RuleArgs {
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.ignored.is_empty()
    }

    pub fn rules(&self) -> TrackingRules {
        TrackingRules::new(&self.extensions, &self.ignored)
    }
}

/// Remote routing/auth values supplied on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct RemoteArgs {
    /// Repository selector forwarded to the server
    #[arg(long)]
    pub repository: Option<String>,

    /// Access token forwarded to the server
    #[arg(long)]
    pub token: Option<String>,
}

impl RemoteArgs {
    pub fn params(&self) -> RemoteParams {
        RemoteParams {
            repository: self.repository.clone(),
            token: self.token.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start tracking the working directory
    Init {
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// Show changes since the last snapshot
    Status {
        #[command(flatten)]
        rules: RuleArgs,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Store the current tree as the new snapshot
    Commit {
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// Print the stored snapshot
    Show {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Copy a remote working directory into an empty destination
    Clone {
        /// Server URL
        url: String,

        /// Destination directory (defaults to --workspace)
        destination: Option<PathBuf>,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Fetch and apply the remote's changes
    Pull {
        /// Server URL
        url: String,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Send committed files the remote lacks
    Push {
        /// Server URL
        url: String,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Serve a working directory to sync clients
    Serve {
        /// Listen address (defaults to server.bind)
        #[arg(long)]
        bind: Option<String>,

        /// Directory to serve (defaults to --workspace)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}
