//! Digest computation for snapshot nodes using BLAKE3

use crate::error::StorageError;
use crate::tree::node::Node;
use blake3::Hasher;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Kind tag folded into every file digest.
const BLOB_TAG: &str = "blob";

/// Compute the digest of a single file.
///
/// digest = hash("blob" || mtime(RFC 3339, seconds) || size || content_hash)
///
/// Metadata is part of the digest, so touching a file without changing its
/// bytes still yields a different digest.
pub fn hash_file(file_path: &Path) -> Result<String, StorageError> {
    let mut file = File::open(file_path).map_err(|e| {
        StorageError::IoError(io::Error::new(
            e.kind(),
            format!("Failed to open file {:?}: {}", file_path, e),
        ))
    })?;
    let metadata = file.metadata()?;

    let mut content = Hasher::new();
    io::copy(&mut file, &mut content).map_err(|e| {
        StorageError::IoError(io::Error::new(
            e.kind(),
            format!("Failed to read file {:?}: {}", file_path, e),
        ))
    })?;
    let content_hash = content.finalize();

    let modified = metadata.modified()?;
    let mut hasher = Hasher::new();
    hasher.update(metadata_line(modified, metadata.len()).as_bytes());
    hasher.update(content_hash.as_bytes());

    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Compute a directory digest from its children, which must already be sorted.
pub fn hash_children(children: &[Node]) -> String {
    let mut hasher = Hasher::new();
    for child in children {
        hasher.update(child.hash.as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}

fn metadata_line(modified: SystemTime, size: u64) -> String {
    let modified: DateTime<Utc> = modified.into();
    format!(
        "{}{}{}",
        BLOB_TAG,
        modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        size
    )
}
