//! Local version control over one working directory.
//!
//! A workspace is `Uninitialized` until `init` persists its first record,
//! then `Clean` or `Dirty` depending on whether the rebuilt tree matches the
//! stored one. Every operation loads what it needs from the store and drops
//! it afterwards; nothing is cached between calls.

use crate::error::StorageError;
use crate::store::{VersionStore, Versioning};
use crate::tree::{diff, Changes, Node, TrackingRules, TreeBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Lifecycle state of a working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceState {
    Uninitialized,
    Clean,
    Dirty,
}

/// A tracked working directory and its version record
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    store: VersionStore,
}

/// Stored record with merged rules, plus the diff against the rebuilt tree.
struct Evaluation {
    record: Versioning,
    changes: Changes,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            store: VersionStore::new(&root),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_initialized(&self) -> bool {
        self.store.exists()
    }

    /// Load the stored record
    pub fn load(&self) -> Result<Versioning, StorageError> {
        self.store.load()
    }

    /// Persist a record
    pub fn save(&self, record: &Versioning) -> Result<(), StorageError> {
        self.store.save(record)
    }

    /// Build the current tree of the working directory under `rules`.
    pub fn snapshot(&self, rules: &TrackingRules) -> Result<Node, StorageError> {
        TreeBuilder::new(self.root.clone(), rules.clone()).build_snapshot()
    }

    /// Create the first record. An empty tree is stored with an empty HEAD.
    #[instrument(skip(self, rules), fields(root = %self.root.display()))]
    pub fn init(&self, rules: &TrackingRules) -> Result<Versioning, StorageError> {
        if self.store.exists() {
            return Err(StorageError::AlreadyInitialized(self.root.clone()));
        }

        let tree = self.snapshot(rules)?;
        let record = Versioning::new(rules, tree);
        self.store.save(&record)?;

        info!(head = %record.head, "Version control initialized");
        Ok(record)
    }

    /// Compare the stored tree with the working directory.
    ///
    /// `extra` rules are merged into the stored ones for this comparison
    /// only. Returns `None` when nothing changed.
    #[instrument(skip(self, extra), fields(root = %self.root.display()))]
    pub fn status(&self, extra: &TrackingRules) -> Result<Option<Changes>, StorageError> {
        let evaluation = self.evaluate(extra)?;
        if evaluation.changes.is_empty() {
            info!("No changes detected");
            return Ok(None);
        }
        Ok(Some(evaluation.changes))
    }

    /// Store the current tree as the new snapshot, together with any merged rules.
    ///
    /// Returns `None` without touching the store when nothing changed.
    #[instrument(skip(self, extra), fields(root = %self.root.display()))]
    pub fn commit(&self, extra: &TrackingRules) -> Result<Option<Versioning>, StorageError> {
        let Evaluation { mut record, changes } = self.evaluate(extra)?;
        if changes.is_empty() {
            info!("Nothing to commit");
            return Ok(None);
        }

        // The root hash changes whenever anything below it does, so the
        // modified root is the complete new tree. It is only missing when
        // every tracked file is gone.
        let tree = changes.modified_root().cloned().unwrap_or_else(Node::empty);
        record.set_tree(tree);
        self.store.save(&record)?;

        info!(head = %record.head, "Committed snapshot");
        Ok(Some(record))
    }

    /// The stored record, for display: HEAD, rules, and the full tree.
    pub fn show(&self) -> Result<Versioning, StorageError> {
        self.store.load()
    }

    /// Current lifecycle state, computed from disk.
    pub fn state(&self) -> Result<WorkspaceState, StorageError> {
        if !self.store.exists() {
            return Ok(WorkspaceState::Uninitialized);
        }
        match self.status(&TrackingRules::default())? {
            Some(_) => Ok(WorkspaceState::Dirty),
            None => Ok(WorkspaceState::Clean),
        }
    }

    fn evaluate(&self, extra: &TrackingRules) -> Result<Evaluation, StorageError> {
        let mut record = self.store.load()?;
        let rules = record.rules().merge(extra);
        record.set_rules(&rules);

        let current = TreeBuilder::new(self.root.clone(), rules).build()?;
        let changes = diff(Some(&record.tree), current.as_ref());
        Ok(Evaluation { record, changes })
    }
}
