//! Sync server
//!
//! Serves one working directory over HTTP. The stored record is the
//! server's view of its tree; it is loaded per request and never cached.
//! Archive responses are produced on a blocking thread and streamed while
//! they are built.

use crate::error::{StorageError, TransferError};
use crate::store::{VersionStore, Versioning};
use crate::sync::wire;
use crate::transfer::channel::{chunk_channel, Chunk, ChannelWriter};
use crate::transfer::{self, ArchiveWriter, FileEntry};
use crate::tree::{diff, Changes, Node};
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::io::{self, Cursor};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use zip::ZipWriter;

/// Default cap on `/push` bodies
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

struct ServerState {
    root: PathBuf,
    store: VersionStore,
    shutdown: CancellationToken,
}

type SharedState = Arc<ServerState>;

/// HTTP server for one working directory
pub struct SyncServer {
    state: SharedState,
    max_upload_bytes: usize,
}

impl SyncServer {
    /// Serve `root`. Cancelling `shutdown` stops the listener and every
    /// in-flight archive producer.
    pub fn new<P: AsRef<Path>>(root: P, shutdown: CancellationToken) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            state: Arc::new(ServerState {
                store: VersionStore::new(&root),
                root,
                shutdown,
            }),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.state.root
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/head", get(head))
            .route("/tree", post(tree))
            .route("/pull", post(pull))
            .route("/push", post(push))
            .route("/clone", get(clone_tree))
            .layer(DefaultBodyLimit::max(self.max_upload_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Bind `addr` and serve until shutdown.
    pub async fn bind(self, addr: &str) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let local: SocketAddr = listener.local_addr()?;
        info!(addr = %local, root = %self.state.root.display(), "Sync server listening");

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        info!("Sync server stopped");
        Ok(())
    }
}

/// Handler failure mapped onto an HTTP status
#[derive(Debug)]
struct HandlerError {
    status: StatusCode,
    message: String,
}

impl HandlerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<StorageError> for HandlerError {
    fn from(err: StorageError) -> Self {
        let status = match err {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<TransferError> for HandlerError {
    fn from(err: TransferError) -> Self {
        let status = match err {
            TransferError::PathTraversal(_) | TransferError::Archive(_) => StatusCode::BAD_REQUEST,
            TransferError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for HandlerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Background task failed: {}", err))
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }
        (self.status, self.message).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct HeadQuery {
    head: Option<String>,
}

async fn load_record(state: &SharedState) -> Result<Versioning, HandlerError> {
    let store = state.store.clone();
    let record = tokio::task::spawn_blocking(move || store.load()).await??;
    Ok(record)
}

fn parse_tree(body: &[u8]) -> Result<Node, HandlerError> {
    serde_json::from_slice(body)
        .map_err(|e| HandlerError::bad_request(format!("Malformed tree: {}", e)))
}

fn ensure_running(state: &SharedState) -> Result<(), HandlerError> {
    if state.shutdown.is_cancelled() {
        return Err(HandlerError {
            status: StatusCode::REQUEST_TIMEOUT,
            message: "Request canceled".to_string(),
        });
    }
    Ok(())
}

#[instrument(skip(state, query))]
async fn head(
    State(state): State<SharedState>,
    Query(query): Query<HeadQuery>,
) -> Result<StatusCode, HandlerError> {
    let client_head = query
        .head
        .ok_or_else(|| HandlerError::bad_request("Missing head parameter"))?;
    let record = load_record(&state).await?;

    debug!(client = %client_head, server = %record.head, "Comparing heads");
    if record.head.eq_ignore_ascii_case(&client_head) {
        Ok(StatusCode::NOT_MODIFIED)
    } else {
        Ok(StatusCode::OK)
    }
}

#[instrument(skip(state, body), fields(bytes = body.len()))]
async fn tree(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<Changes>, HandlerError> {
    let client_tree = parse_tree(&body)?;
    let record = load_record(&state).await?;

    let changes = diff(Some(&record.tree), Some(&client_tree));
    info!(
        added = changes.added.len(),
        removed = changes.removed.len(),
        modified = changes.modified.len(),
        "Tree diff computed"
    );
    Ok(Json(changes))
}

#[instrument(skip(state, body), fields(bytes = body.len()))]
async fn pull(State(state): State<SharedState>, body: Bytes) -> Result<Response, HandlerError> {
    let client_tree = parse_tree(&body)?;
    let record = load_record(&state).await?;

    let changes = diff(Some(&client_tree), Some(&record.tree));
    let removed = wire::join_list(changes.removed_paths());
    let wanted = changes.transfer_paths();
    let wanted_count = wanted.len();

    // Files are matched against what is on disk now; a snapshot entry that
    // has since vanished from the working directory is simply not sent.
    let files = transfer::tracked_files(&state.root, &record.rules()).filter(move |entry| {
        entry
            .as_ref()
            .map_or(true, |entry| wanted.contains(&entry.relative))
    });

    ensure_running(&state)?;
    info!(files = wanted_count, removed = changes.removed.len(), "Streaming pull archive");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, wire::CONTENT_TYPE_ZIP)
        .header(wire::HEADER_REMOVED, removed)
        .header(wire::HEADER_CONFIG_EXT, wire::join_list(&record.extensions))
        .header(wire::HEADER_CONFIG_IGNORE, wire::join_list(&record.ignored))
        .body(stream_archive(&state, files))
        .map_err(|e| HandlerError::internal(format!("Failed to build response: {}", e)))
}

#[instrument(skip(state, body), fields(bytes = body.len()))]
async fn push(State(state): State<SharedState>, body: Bytes) -> Result<StatusCode, HandlerError> {
    let root = state.root.clone();
    let extracted =
        tokio::task::spawn_blocking(move || transfer::unpack(Cursor::new(body), &root)).await??;

    info!(files = extracted.len(), "Applied pushed archive");
    Ok(StatusCode::OK)
}

#[instrument(skip(state))]
async fn clone_tree(State(state): State<SharedState>) -> Result<Response, HandlerError> {
    let record = load_record(&state).await?;
    let rules = record.rules();
    let files = transfer::tracked_files(&state.root, &rules);

    ensure_running(&state)?;
    info!(head = %record.head, "Streaming clone archive");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, wire::CONTENT_TYPE_ZIP)
        .header(wire::HEADER_CONFIG_EXT, wire::join_list(&record.extensions))
        .header(wire::HEADER_CONFIG_IGNORE, wire::join_list(&record.ignored))
        .body(stream_archive(&state, files))
        .map_err(|e| HandlerError::internal(format!("Failed to build response: {}", e)))
}

/// Spawn the archive producer and return a body that drains it.
///
/// The producer stops on shutdown or when the body is dropped; a failure
/// after streaming started is forwarded as a body error, which aborts the
/// response instead of ending it cleanly.
fn stream_archive<I>(state: &SharedState, files: I) -> Body
where
    I: IntoIterator<Item = Result<FileEntry, TransferError>> + Send + 'static,
{
    let (tx, rx) = chunk_channel();
    let cancel = state.shutdown.clone();

    tokio::task::spawn_blocking(move || {
        let error_tx = tx.clone();
        let archive = ArchiveWriter::from_zip(ZipWriter::new_stream(ChannelWriter::new(tx)));
        match transfer::pack_into(archive, files, &cancel) {
            Ok(writer) => drop(writer),
            Err(TransferError::IoError(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("Client went away during archive stream");
            }
            Err(e) => {
                warn!("Archive stream aborted: {}", e);
                let _ = error_tx.blocking_send(Err(io::Error::new(io::ErrorKind::Other, e.to_string())));
            }
        }
    });

    Body::from_stream(receiver_stream(rx))
}

fn receiver_stream(rx: mpsc::Receiver<Chunk>) -> impl futures::Stream<Item = Chunk> {
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) })
}
