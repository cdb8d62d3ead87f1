//! Relative path normalization for snapshot nodes and archive entries

use crate::error::StorageError;
use crate::tree::node::ROOT_PATH;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Resolve a working directory to an absolute path, without verbatim prefixes on Windows.
pub fn canonicalize_root(root: &Path) -> Result<PathBuf, StorageError> {
    dunce::canonicalize(root).map_err(|e| {
        StorageError::InvalidPath(format!("Failed to canonicalize {:?}: {}", root, e))
    })
}

/// Relative path of `path` under `root`, as stored in a node.
///
/// Components are joined with `/` and normalized to Unicode NFC so the same
/// tree hashes and diffs identically regardless of the host platform.
pub fn relative_path(root: &Path, path: &Path) -> Result<String, StorageError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        StorageError::InvalidPath(format!("{:?} is not inside {:?}", path, root))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_string_lossy().nfc().collect::<String>()),
            Component::CurDir => {}
            other => {
                return Err(StorageError::InvalidPath(format!(
                    "Unexpected component {:?} in {:?}",
                    other, relative
                )))
            }
        }
    }

    if parts.is_empty() {
        Ok(ROOT_PATH.to_string())
    } else {
        Ok(parts.join("/"))
    }
}

/// Normalize a path string received from a peer (NFC, `/` separators, no trailing slash)
pub fn normalize_path_string(path: &str) -> String {
    let normalized: String = path.nfc().collect();
    let mut result = normalized.replace('\\', "/");
    while result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

/// Map a stored relative path back onto the filesystem under `root`.
pub fn to_native(root: &Path, relative: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in relative.split('/') {
        if part.is_empty() || part == ROOT_PATH {
            continue;
        }
        out.push(part);
    }
    out
}

/// Lowercased extension of a file name, including the leading dot.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}
