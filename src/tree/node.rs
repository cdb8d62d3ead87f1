//! Snapshot tree nodes

use serde::{Deserialize, Serialize};

/// Path of the root node of every snapshot tree.
pub const ROOT_PATH: &str = ".";

/// Node kind, serialized as `blob` / `tree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A tracked file
    Blob,
    /// A directory with at least one tracked descendant
    Tree,
}

/// One entry of a snapshot tree.
///
/// `path` is relative to the snapshot root with `/` separators. Children are
/// kept sorted by path; a `Tree` node is never built without children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub path: String,
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a file node
    pub fn blob(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            kind: NodeKind::Blob,
            children: Vec::new(),
        }
    }

    /// Create a directory node from already-hashed children
    pub fn tree(path: impl Into<String>, hash: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            kind: NodeKind::Tree,
            children,
        }
    }

    /// The "no snapshot" tree: a root with an empty hash and no children.
    pub fn empty() -> Self {
        Self::tree(ROOT_PATH, "", Vec::new())
    }

    pub fn is_blob(&self) -> bool {
        self.kind == NodeKind::Blob
    }

    /// True for the empty-hash placeholder produced when nothing is tracked.
    pub fn is_empty_snapshot(&self) -> bool {
        self.hash.is_empty()
    }

    /// All blob nodes at or below this node, in path order.
    pub fn files(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a Node>) {
        match self.kind {
            NodeKind::Blob => out.push(self),
            NodeKind::Tree => {
                for child in &self.children {
                    child.collect_files(out);
                }
            }
        }
    }

    /// Depth-first walk yielding `(depth, node)` pairs, root first.
    pub fn walk(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }
}
