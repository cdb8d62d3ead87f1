//! Tree builder for constructing snapshot trees from the filesystem

use crate::error::StorageError;
use crate::store::CONTROL_DIR;
use crate::tree::hasher;
use crate::tree::node::Node;
use crate::tree::path;
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace};
use walkdir::WalkDir;

/// Which files take part in a snapshot.
///
/// Extensions are matched case-insensitively and stored with a leading dot.
/// Ignored names are matched against the base name of files and directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingRules {
    extensions: BTreeSet<String>,
    ignored: BTreeSet<String>,
}

impl TrackingRules {
    pub fn new<I, J, S, T>(extensions: I, ignored: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            ignored: ignored
                .into_iter()
                .filter_map(|name| normalize_name(name.as_ref()))
                .collect(),
        }
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn ignored(&self) -> impl Iterator<Item = &str> {
        self.ignored.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.ignored.is_empty()
    }

    /// Set union of both rule sets.
    pub fn merge(&self, other: &TrackingRules) -> TrackingRules {
        TrackingRules {
            extensions: self.extensions.union(&other.extensions).cloned().collect(),
            ignored: self.ignored.union(&other.ignored).cloned().collect(),
        }
    }

    /// True when a file with this base name has an allowed extension.
    pub fn allows_file(&self, name: &str) -> bool {
        path::extension_of(name)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }

    /// True when an entry with this base name is excluded unconditionally.
    pub fn is_ignored(&self, name: &str) -> bool {
        name == CONTROL_DIR || self.ignored.contains(&name.to_lowercase())
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        None
    } else {
        Some(format!(".{}", ext.to_lowercase()))
    }
}

fn normalize_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// Tree builder for a working directory
pub struct TreeBuilder {
    root: PathBuf,
    rules: TrackingRules,
}

impl TreeBuilder {
    /// Create a new tree builder for the given root path
    pub fn new(root: PathBuf, rules: TrackingRules) -> Self {
        Self { root, rules }
    }

    /// Build the snapshot tree of the whole working directory.
    ///
    /// Returns `None` when no tracked file survives filtering. Any stat or
    /// read failure aborts the whole build.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn build(&self) -> Result<Option<Node>, StorageError> {
        let start = Instant::now();
        info!("Starting tree build");

        let tree = self.walk().map_err(|e| {
            error!("Tree build failed: {}", e);
            e
        })?;

        info!(
            files = tree.as_ref().map(|t| t.files().len()).unwrap_or(0),
            root_hash = tree.as_ref().map(|t| t.hash.as_str()).unwrap_or(""),
            duration_ms = start.elapsed().as_millis(),
            "Tree build completed"
        );
        Ok(tree)
    }

    /// Build the snapshot, substituting the empty-hash root when nothing is tracked.
    pub fn build_snapshot(&self) -> Result<Node, StorageError> {
        Ok(self.build()?.unwrap_or_else(Node::empty))
    }

    /// Walk the working directory once, depth first in name order, folding
    /// each directory into a node as soon as the walk leaves it.
    ///
    /// Symlinks are followed; a link back into an ancestor is a loop and
    /// fails the build.
    fn walk(&self) -> Result<Option<Node>, StorageError> {
        let filter_rules = self.rules.clone();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let ignored = entry.depth() > 0
                    && filter_rules.is_ignored(&entry.file_name().to_string_lossy());
                if ignored {
                    debug!(path = %entry.path().display(), "Skipping ignored entry");
                }
                !ignored
            });

        let mut open: Vec<PendingDir> = Vec::new();
        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            while open.last().is_some_and(|dir| dir.depth >= entry.depth()) {
                close_innermost(&mut open);
            }

            let relative = path::relative_path(&self.root, entry.path())?;
            if entry.file_type().is_dir() {
                open.push(PendingDir {
                    depth: entry.depth(),
                    relative,
                    children: Vec::new(),
                });
                continue;
            }
            if !entry.file_type().is_file()
                || !self.rules.allows_file(&entry.file_name().to_string_lossy())
            {
                continue;
            }

            let parent = open.last_mut().ok_or_else(|| {
                StorageError::InvalidPath(format!("{:?} is not a directory", self.root))
            })?;
            trace!(path = %relative, "Hashing file");
            let hash = hasher::hash_file(entry.path())?;
            parent.children.push(Node::blob(relative, hash));
        }

        let mut root = None;
        while !open.is_empty() {
            root = close_innermost(&mut open);
        }
        Ok(root)
    }
}

/// A directory the walk has entered but not yet left
struct PendingDir {
    depth: usize,
    relative: String,
    children: Vec<Node>,
}

impl PendingDir {
    /// Directories without tracked descendants produce no node.
    fn finish(mut self) -> Option<Node> {
        if self.children.is_empty() {
            return None;
        }
        self.children.sort_by(|a, b| a.path.cmp(&b.path));
        let hash = hasher::hash_children(&self.children);
        Some(Node::tree(self.relative, hash, self.children))
    }
}

/// Finish the innermost open directory and attach it to its parent.
/// Returns the finished node only when it was the root.
fn close_innermost(open: &mut Vec<PendingDir>) -> Option<Node> {
    let node = open.pop()?.finish();
    match open.last_mut() {
        Some(parent) => {
            parent.children.extend(node);
            None
        }
        None => node,
    }
}

fn walk_error(err: walkdir::Error) -> StorageError {
    let message = err.to_string();
    let kind = err
        .io_error()
        .map(|e| e.kind())
        .unwrap_or(io::ErrorKind::Other);
    StorageError::IoError(io::Error::new(kind, message))
}
