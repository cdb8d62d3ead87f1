//! Property-based tests for the tree differ

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tinyvcs::tree::hasher::hash_children;
use tinyvcs::tree::{diff, Node};

/// Build a tree from `dir/file -> content hash` entries, the way the builder
/// shapes it: sorted children, directory hash over child hashes.
fn tree_from(files: &BTreeMap<(u8, u8), u8>) -> Node {
    let mut dirs: BTreeMap<String, Vec<Node>> = BTreeMap::new();
    for ((dir, file), version) in files {
        let dir_path = format!("d{}", dir);
        let path = format!("{}/f{}.txt", dir_path, file);
        dirs.entry(dir_path)
            .or_default()
            .push(Node::blob(path, format!("blob-{}-{}-{}", dir, file, version)));
    }
    let children: Vec<Node> = dirs
        .into_iter()
        .map(|(path, files)| Node::tree(path, hash_children(&files), files))
        .collect();
    if children.is_empty() {
        return Node::empty();
    }
    Node::tree(".", hash_children(&children), children)
}

fn file_map() -> impl Strategy<Value = BTreeMap<(u8, u8), u8>> {
    prop::collection::btree_map((0u8..4, 0u8..4), 0u8..3, 0..12)
}

fn paths(nodes: &[Node]) -> BTreeSet<String> {
    nodes.iter().map(|node| node.path.clone()).collect()
}

proptest! {
    #[test]
    fn prop_diff_against_self_is_empty(files in file_map()) {
        let tree = tree_from(&files);
        let rebuilt = tree_from(&files);
        prop_assert!(diff(Some(&tree), Some(&tree)).is_empty());
        prop_assert!(diff(Some(&tree), Some(&rebuilt)).is_empty());
    }

    #[test]
    fn prop_diff_is_mirrored_when_reversed(left in file_map(), right in file_map()) {
        let a = tree_from(&left);
        let b = tree_from(&right);
        let forward = diff(Some(&a), Some(&b));
        let backward = diff(Some(&b), Some(&a));

        prop_assert_eq!(paths(&forward.added), paths(&backward.removed));
        prop_assert_eq!(paths(&forward.removed), paths(&backward.added));
        prop_assert_eq!(paths(&forward.modified), paths(&backward.modified));
    }

    #[test]
    fn prop_modified_always_includes_root(left in file_map(), right in file_map()) {
        let a = tree_from(&left);
        let b = tree_from(&right);
        prop_assume!(!a.is_empty_snapshot() && !b.is_empty_snapshot());
        let changes = diff(Some(&a), Some(&b));

        if a.hash != b.hash {
            prop_assert!(changes.modified_root().is_some());
        } else {
            prop_assert!(changes.is_empty());
        }
    }

    #[test]
    fn prop_transfer_paths_are_files_in_current(left in file_map(), right in file_map()) {
        let a = tree_from(&left);
        let b = tree_from(&right);
        let current: BTreeSet<String> = b.files().iter().map(|n| n.path.clone()).collect();

        for path in diff(Some(&a), Some(&b)).transfer_paths() {
            prop_assert!(current.contains(&path));
        }
    }
}
