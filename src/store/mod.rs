//! Version Store
//!
//! The persisted snapshot record of a working directory. Exactly one record
//! lives under the hidden control directory at the working-directory root;
//! it is the only durable state of the system.

pub mod persistence;

pub use persistence::VersionStore;

use crate::tree::{Node, TrackingRules};
use serde::{Deserialize, Serialize};

/// Name of the hidden control directory at the working-directory root.
pub const CONTROL_DIR: &str = ".tinyvcs";

/// Name of the record file inside the control directory.
pub const VERSION_FILE: &str = "version";

/// Snapshot record: tracking configuration, HEAD, and the full tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioning {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub ignored: Vec<String>,
    pub head: String,
    pub tree: Node,
}

impl Versioning {
    /// Create a record for `tree`; HEAD is the root hash, or empty for the empty tree.
    pub fn new(rules: &TrackingRules, tree: Node) -> Self {
        Self {
            extensions: rules.extensions().map(str::to_string).collect(),
            ignored: rules.ignored().map(str::to_string).collect(),
            head: tree.hash.clone(),
            tree,
        }
    }

    /// Tracking rules stored in this record.
    pub fn rules(&self) -> TrackingRules {
        TrackingRules::new(&self.extensions, &self.ignored)
    }

    /// Replace the tracking rules, keeping the tree.
    pub fn set_rules(&mut self, rules: &TrackingRules) {
        self.extensions = rules.extensions().map(str::to_string).collect();
        self.ignored = rules.ignored().map(str::to_string).collect();
    }

    /// Replace the stored tree and move HEAD to its root hash.
    pub fn set_tree(&mut self, tree: Node) {
        self.head = tree.hash.clone();
        self.tree = tree;
    }
}
