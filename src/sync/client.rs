//! Sync client
//!
//! Orchestrates clone, pull, and push against a remote. HTTP runs on the
//! async runtime; tree builds, archive packing, and unpacking run on
//! blocking threads. A failed request surfaces as an error and is never
//! retried.

use crate::config::ClientConfig;
use crate::error::{StorageError, SyncError, TransferError};
use crate::store::{VersionStore, Versioning};
use crate::sync::remote::Remote;
use crate::sync::wire;
use crate::transfer::{self, FileEntry};
use crate::tree::node::ROOT_PATH;
use crate::tree::{Changes, Node, TrackingRules};
use crate::workspace::Workspace;
use futures::StreamExt;
use reqwest::{Response, StatusCode};
use serde::Serialize;
use std::fs;
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Outcome of a clone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneReport {
    pub destination: PathBuf,
    pub files: Vec<String>,
    pub head: String,
}

/// Outcome of a pull
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub up_to_date: bool,
    pub received: Vec<String>,
    pub removed: Vec<String>,
    pub head: String,
}

/// Outcome of a push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub up_to_date: bool,
    pub sent: Vec<String>,
}

/// HTTP client for one remote
pub struct SyncClient {
    remote: Remote,
    http: reqwest::Client,
}

impl SyncClient {
    pub fn new(remote: Remote, config: &ClientConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { remote, http })
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    /// Ask whether the server HEAD differs from `head`.
    pub async fn head_changed(&self, head: &str) -> Result<bool, SyncError> {
        let url = self.remote.endpoint(wire::ROUTE_HEAD, &[(wire::QUERY_HEAD, head)])?;
        let response = self.http.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(false),
            StatusCode::OK => Ok(true),
            status => Err(remote_error(wire::ROUTE_HEAD, status)),
        }
    }

    /// Diff the server's stored tree against `tree`.
    pub async fn tree_diff(&self, tree: &Node) -> Result<Changes, SyncError> {
        let url = self.remote.endpoint(wire::ROUTE_TREE, &[])?;
        let response = self.http.post(url).json(tree).send().await?;
        let response = expect_ok(wire::ROUTE_TREE, response)?;

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| SyncError::CorruptState(format!("Malformed changes from server: {}", e)))
    }

    /// Clone the remote into `destination`, which must exist and not be initialized.
    #[instrument(skip(self), fields(remote = %self.remote.base()))]
    pub async fn clone_into(&self, destination: &Path) -> Result<CloneReport, SyncError> {
        let metadata = fs::metadata(destination).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Clone destination {:?} is unavailable: {}", destination, e),
            )
        })?;
        if !metadata.is_dir() {
            return Err(SyncError::IoError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Clone destination {:?} is not a directory", destination),
            )));
        }
        if VersionStore::new(destination).exists() {
            return Err(StorageError::AlreadyInitialized(destination.to_path_buf()).into());
        }

        let url = self.remote.endpoint(wire::ROUTE_CLONE, &[])?;
        let response = expect_ok(wire::ROUTE_CLONE, self.http.get(url).send().await?)?;

        let extensions = header_list(&response, wire::HEADER_CONFIG_EXT);
        if extensions.is_empty() {
            return Err(SyncError::Unconfigured(wire::HEADER_CONFIG_EXT));
        }
        let ignored = header_list(&response, wire::HEADER_CONFIG_IGNORE);
        let rules = TrackingRules::new(&extensions, &ignored);

        let archive = download(response).await?;
        let root = destination.to_path_buf();
        let (files, record) = tokio::task::spawn_blocking(move || {
            let files = transfer::unpack(archive, &root).map_err(payload_error)?;
            let workspace = Workspace::new(&root);
            let record = Versioning::new(&rules, workspace.snapshot(&rules)?);
            workspace.save(&record)?;
            Ok::<_, SyncError>((files, record))
        })
        .await??;

        info!(files = files.len(), head = %record.head, "Clone complete");
        Ok(CloneReport {
            destination: destination.to_path_buf(),
            files,
            head: record.head,
        })
    }

    /// Bring `workspace` up to date with the remote.
    #[instrument(skip(self, workspace), fields(remote = %self.remote.base(), root = %workspace.root().display()))]
    pub async fn pull(&self, workspace: &Workspace) -> Result<PullReport, SyncError> {
        let record = load_record(workspace).await?;
        if !self.head_changed(&record.head).await? {
            info!(head = %record.head, "Already up to date");
            return Ok(PullReport {
                up_to_date: true,
                head: record.head,
                ..PullReport::default()
            });
        }

        let url = self.remote.endpoint(wire::ROUTE_PULL, &[])?;
        let response = self.http.post(url).json(&record.tree).send().await?;
        let response = expect_ok(wire::ROUTE_PULL, response)?;

        let removed = header_list(&response, wire::HEADER_REMOVED);
        let server_extensions = header_list(&response, wire::HEADER_CONFIG_EXT);
        let rules = if server_extensions.is_empty() {
            record.rules()
        } else {
            TrackingRules::new(&server_extensions, header_list(&response, wire::HEADER_CONFIG_IGNORE))
        };

        let archive = download(response).await?;
        let workspace = workspace.clone();
        let (received, removed, record) = tokio::task::spawn_blocking(move || {
            let received = transfer::unpack(archive, workspace.root()).map_err(payload_error)?;
            let removed = remove_paths(workspace.root(), removed)?;

            let mut record = record;
            record.set_rules(&rules);
            record.set_tree(workspace.snapshot(&rules)?);
            workspace.save(&record)?;
            Ok::<_, SyncError>((received, removed, record))
        })
        .await??;

        info!(
            received = received.len(),
            removed = removed.len(),
            head = %record.head,
            "Pull complete"
        );
        Ok(PullReport {
            up_to_date: false,
            received,
            removed,
            head: record.head,
        })
    }

    /// Send the files the remote lacks, as recorded in the local snapshot.
    ///
    /// The remote unpacks them into its working directory; folding them into
    /// its snapshot is a separate commit on the server side.
    #[instrument(skip(self, workspace), fields(remote = %self.remote.base(), root = %workspace.root().display()))]
    pub async fn push(&self, workspace: &Workspace) -> Result<PushReport, SyncError> {
        let record = load_record(workspace).await?;
        if !self.head_changed(&record.head).await? {
            info!(head = %record.head, "Remote already up to date");
            return Ok(PushReport {
                up_to_date: true,
                sent: Vec::new(),
            });
        }

        let changes = self.tree_diff(&record.tree).await?;
        let sent: Vec<String> = changes.transfer_paths().into_iter().collect();
        if sent.is_empty() {
            info!("Remote needs no files");
            return Ok(PushReport {
                up_to_date: false,
                sent,
            });
        }

        let root = workspace.root().to_path_buf();
        let entries: Vec<FileEntry> = sent.iter().map(|path| FileEntry::under(&root, path)).collect();
        let archive = tokio::task::spawn_blocking(move || transfer::pack(&entries)).await??;

        let url = self.remote.endpoint(wire::ROUTE_PUSH, &[])?;
        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, wire::CONTENT_TYPE_ZIP)
            .body(archive)
            .send()
            .await?;
        expect_ok(wire::ROUTE_PUSH, response)?;

        info!(files = sent.len(), "Push complete");
        Ok(PushReport {
            up_to_date: false,
            sent,
        })
    }
}

fn remote_error(route: &'static str, status: StatusCode) -> SyncError {
    SyncError::Remote {
        route,
        status: status.as_u16(),
    }
}

fn expect_ok(route: &'static str, response: Response) -> Result<Response, SyncError> {
    if response.status() != StatusCode::OK {
        warn!(route, status = %response.status(), "Remote request failed");
        return Err(remote_error(route, response.status()));
    }
    Ok(response)
}

/// An archive the server sent that cannot be read is a corrupt payload;
/// local I/O and traversal failures keep their own kinds.
fn payload_error(err: TransferError) -> SyncError {
    match err {
        TransferError::Archive(message) => {
            SyncError::CorruptState(format!("Malformed archive from server: {}", message))
        }
        other => other.into(),
    }
}

fn header_list(response: &Response, name: &str) -> Vec<String> {
    response
        .headers()
        .get(name)
        .map(|value| wire::split_list(&String::from_utf8_lossy(value.as_bytes())))
        .unwrap_or_default()
}

async fn load_record(workspace: &Workspace) -> Result<Versioning, SyncError> {
    let workspace = workspace.clone();
    let record = tokio::task::spawn_blocking(move || workspace.load()).await??;
    Ok(record)
}

/// Spool a response body into an anonymous temp file, rewound for reading.
async fn download(response: Response) -> Result<fs::File, SyncError> {
    let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
    let mut body = response.bytes_stream();
    let mut bytes = 0usize;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        bytes += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    let mut file = file.into_std().await;
    file.seek(SeekFrom::Start(0))?;
    debug!(bytes, "Archive downloaded");
    Ok(file)
}

/// Delete paths the server reported removed. Directories go recursively;
/// already-missing paths are skipped. Returns the paths actually deleted.
fn remove_paths(root: &Path, removed: Vec<String>) -> Result<Vec<String>, SyncError> {
    let canonical_root = dunce::canonicalize(root)?;
    let mut deleted = Vec::new();
    for relative in removed {
        if relative == ROOT_PATH {
            continue;
        }
        let target = transfer::resolve_entry_path(root, &relative)?;
        if let Some(parent) = target.parent() {
            transfer::confine(&canonical_root, parent)?;
        }
        let result = match fs::symlink_metadata(&target) {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&target),
            Ok(_) => fs::remove_file(&target),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                debug!(path = %relative, "Removed path");
                deleted.push(relative);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(deleted)
}
