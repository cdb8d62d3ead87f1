//! Error types for the tinyvcs snapshot and sync system.

use std::path::PathBuf;
use thiserror::Error;

/// Snapshot storage and local version control errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No version record found at {0:?}")]
    NotFound(PathBuf),

    #[error("Version control already initialized at {0:?}")]
    AlreadyInitialized(PathBuf),

    #[error("Corrupt version record: {0}")]
    CorruptState(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Archive packing and unpacking errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Archive entry escapes destination: {0}")]
    PathTraversal(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Transfer I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for TransferError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => TransferError::IoError(e),
            other => TransferError::Archive(other.to_string()),
        }
    }
}

/// Client/server synchronization errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote returned {status} for /{route}")]
    Remote { route: &'static str, status: u16 },

    #[error("Remote response is missing required configuration: {0}")]
    Unconfigured(&'static str),

    #[error("Corrupt payload: {0}")]
    CorruptState(String),

    #[error("Invalid remote: {0}")]
    InvalidRemote(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Sync I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        SyncError::Task(err.to_string())
    }
}

/// Configuration and CLI wiring errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Top-level error surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to render output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
