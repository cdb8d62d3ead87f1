//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{CommandError, StorageError, SyncError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &CommandError) -> String {
    match e {
        CommandError::Storage(StorageError::NotFound(path))
        | CommandError::Sync(SyncError::Storage(StorageError::NotFound(path))) => format!(
            "No version record in {}; run `tinyvcs init` or `tinyvcs clone` first",
            path.display()
        ),
        CommandError::Sync(SyncError::Remote { route, status }) => {
            format!("Server rejected /{} with status {}", route, status)
        }
        other => other.to_string(),
    }
}
