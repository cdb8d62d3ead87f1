//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::parse::{Commands, RemoteArgs};
use crate::cli::presentation::{
    format_clone_report, format_commit_result, format_init_result, format_pull_report,
    format_push_report, format_show_result, format_status_result,
};
use crate::config::TinyConfig;
use crate::error::{CommandError, ConfigError};
use crate::sync::{Remote, SyncClient, SyncServer};
use crate::tree::path;
use crate::workspace::Workspace;
use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runtime context for CLI execution: workspace root and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: TinyConfig,
    color: bool,
}

impl RunContext {
    /// Create run context from an already-loaded configuration.
    pub fn with_config(workspace_root: PathBuf, config: TinyConfig) -> Self {
        Self {
            workspace_root,
            config,
            color: std::io::stdout().is_terminal(),
        }
    }

    pub fn config(&self) -> &TinyConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, CommandError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        match &result {
            Ok(_) => info!(
                command = command_name(command),
                duration_ms = started.elapsed().as_millis(),
                "Command finished"
            ),
            Err(e) => warn!(command = command_name(command), error = %e, "Command failed"),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, CommandError> {
        match command {
            Commands::Init { rules } => {
                let workspace = self.workspace()?;
                let rules = if rules.is_empty() {
                    self.config.tracking.rules()
                } else {
                    rules.rules()
                };
                let record = workspace.init(&rules)?;
                Ok(format_init_result(&record))
            }
            Commands::Status { rules, format } => {
                let workspace = self.workspace()?;
                let changes = workspace.status(&rules.rules())?;
                format_status_result(changes.as_ref(), format, self.color)
            }
            Commands::Commit { rules } => {
                let workspace = self.workspace()?;
                let record = workspace.commit(&rules.rules())?;
                Ok(format_commit_result(record.as_ref()))
            }
            Commands::Show { format } => {
                let workspace = self.workspace()?;
                let record = workspace.show()?;
                let state = workspace.state()?;
                format_show_result(&record, state, format, self.color)
            }
            Commands::Clone {
                url,
                destination,
                remote,
            } => {
                let client = self.client(url, remote)?;
                let destination = destination.as_deref().unwrap_or(self.workspace_root.as_path());
                let report = block_on(client.clone_into(destination))??;
                Ok(format_clone_report(&report))
            }
            Commands::Pull { url, remote } => {
                let workspace = self.workspace()?;
                let client = self.client(url, remote)?;
                let report = block_on(client.pull(&workspace))??;
                Ok(format_pull_report(&report))
            }
            Commands::Push { url, remote } => {
                let workspace = self.workspace()?;
                let client = self.client(url, remote)?;
                let report = block_on(client.push(&workspace))??;
                Ok(format_push_report(&report))
            }
            Commands::Serve { bind, root } => {
                let bind = bind.clone().unwrap_or_else(|| self.config.server.bind.clone());
                let root = root.clone().unwrap_or_else(|| self.serve_root());
                self.serve(&bind, root)?;
                Ok("Server stopped.".to_string())
            }
        }
    }

    fn workspace(&self) -> Result<Workspace, CommandError> {
        Ok(Workspace::new(path::canonicalize_root(&self.workspace_root)?))
    }

    fn client(&self, url: &str, remote: &RemoteArgs) -> Result<SyncClient, CommandError> {
        let params = self.config.client.params.overlay(&remote.params());
        let remote = Remote::parse(url, params)?;
        Ok(SyncClient::new(remote, &self.config.client)?)
    }

    /// `server.root` resolved against the workspace when relative.
    fn serve_root(&self) -> PathBuf {
        let root = &self.config.server.root;
        if root.is_absolute() {
            root.clone()
        } else {
            self.workspace_root.join(root)
        }
    }

    fn serve(&self, bind: &str, root: PathBuf) -> Result<(), CommandError> {
        let shutdown = CancellationToken::new();
        let server = SyncServer::new(&root, shutdown.clone())
            .with_max_upload_bytes(self.config.server.max_upload_bytes);

        block_on(async move {
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested");
                    signal_token.cancel();
                }
            });
            server.bind(bind).await
        })??;
        Ok(())
    }
}

/// Run a future to completion on a fresh multi-thread runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, CommandError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ConfigError::Invalid(format!("Failed to start async runtime: {}", e)))?;
    debug!("Async runtime started");
    Ok(runtime.block_on(future))
}

/// Stable command name for logging.
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init { .. } => "init",
        Commands::Status { .. } => "status",
        Commands::Commit { .. } => "commit",
        Commands::Show { .. } => "show",
        Commands::Clone { .. } => "clone",
        Commands::Pull { .. } => "pull",
        Commands::Push { .. } => "push",
        Commands::Serve { .. } => "serve",
    }
}
