//! Snapshot tree comparison

use crate::tree::node::{Node, ROOT_PATH};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of comparing a saved tree against a current tree.
///
/// `added` and `modified` hold nodes from the current tree, `removed` holds
/// nodes from the saved tree. Whole subtrees that appear or disappear are
/// recorded once, at the root of that subtree. `modified` includes every
/// directory whose hash changed, so file-only consumers filter by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    #[serde(default)]
    pub added: Vec<Node>,
    #[serde(default)]
    pub removed: Vec<Node>,
    #[serde(default)]
    pub modified: Vec<Node>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    fn extend(&mut self, other: Changes) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.modified.extend(other.modified);
    }

    /// The modified root node, present whenever anything below the root changed.
    pub fn modified_root(&self) -> Option<&Node> {
        self.modified.iter().find(|node| node.path == ROOT_PATH)
    }

    /// Paths of every file whose content must be shipped to bring the saved
    /// side up to date: modified files plus every file under an added node.
    pub fn transfer_paths(&self) -> BTreeSet<String> {
        let modified = self.modified.iter().filter(|node| node.is_blob());
        let added = self.added.iter().flat_map(|node| node.files());
        modified
            .chain(added)
            .map(|node| node.path.clone())
            .collect()
    }

    /// Paths of removed nodes, as recorded (directories are not expanded).
    pub fn removed_paths(&self) -> Vec<String> {
        self.removed.iter().map(|node| node.path.clone()).collect()
    }
}

/// Compare a saved tree against a current tree.
///
/// Equal hashes short-circuit without visiting children. A saved tree with an
/// empty hash stands for "no prior snapshot".
pub fn diff(saved: Option<&Node>, current: Option<&Node>) -> Changes {
    let mut changes = Changes::default();

    let saved = saved.filter(|node| !(node.is_empty_snapshot() && current.is_none()));
    match (saved, current) {
        (None, None) => {}
        (None, Some(current)) => changes.added.push(current.clone()),
        (Some(saved), None) => changes.removed.push(saved.clone()),
        (Some(saved), Some(current)) => {
            if saved.hash == current.hash {
                return changes;
            }
            changes.modified.push(current.clone());
            changes.extend(diff_children(saved, current));
        }
    }

    changes
}

fn diff_children(saved: &Node, current: &Node) -> Changes {
    let mut changes = Changes::default();

    let saved_children: BTreeMap<&str, &Node> = saved
        .children
        .iter()
        .map(|child| (child.path.as_str(), child))
        .collect();
    let current_children: BTreeMap<&str, &Node> = current
        .children
        .iter()
        .map(|child| (child.path.as_str(), child))
        .collect();

    for (path, current_child) in &current_children {
        match saved_children.get(path) {
            Some(saved_child) => changes.extend(diff(Some(saved_child), Some(current_child))),
            None => changes.added.push((*current_child).clone()),
        }
    }

    for (path, saved_child) in &saved_children {
        if !current_children.contains_key(path) {
            changes.removed.push((*saved_child).clone());
        }
    }

    changes
}
