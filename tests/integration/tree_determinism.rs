//! Integration tests for tree building determinism and change detection

use crate::integration::test_utils::{txt_rules, write_file};
use std::fs;
use tinyvcs::tree::{diff, NodeKind, TrackingRules, TreeBuilder};
use tempfile::TempDir;

fn build(root: &std::path::Path, rules: TrackingRules) -> tinyvcs::tree::Node {
    TreeBuilder::new(root.to_path_buf(), rules).build_snapshot().unwrap()
}

/// Test that the same filesystem produces the same tree twice
#[test]
fn test_same_filesystem_same_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "file1.txt", "content1", 1_600_000_000);
    write_file(root, "file2.txt", "content2", 1_600_000_000);
    write_file(root, "dir1/file3.txt", "content3", 1_600_000_000);

    let first = build(root, txt_rules());
    let second = build(root, txt_rules());
    assert_eq!(first, second);
}

/// Test that two directories with identical content and mtimes hash identically
#[test]
fn test_identical_copies_same_root() {
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    // Created in opposite orders to vary directory enumeration.
    for name in ["a.txt", "m.txt", "z.txt"] {
        write_file(left.path(), name, name, 1_600_000_000);
    }
    for name in ["z.txt", "m.txt", "a.txt"] {
        write_file(right.path(), name, name, 1_600_000_000);
    }

    let left_tree = build(left.path(), txt_rules());
    let right_tree = build(right.path(), txt_rules());
    assert_eq!(left_tree.hash, right_tree.hash);
    let order: Vec<_> = left_tree.children.iter().map(|n| n.path.as_str()).collect();
    assert_eq!(order, vec!["a.txt", "m.txt", "z.txt"]);
}

/// Test that one changed byte propagates to every ancestor and nowhere else
#[test]
fn test_single_byte_change_reaches_root_only_through_ancestors() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "top.txt", "top", 1_600_000_000);
    write_file(root, "a/sibling.txt", "sibling", 1_600_000_000);
    write_file(root, "a/b/leaf.txt", "leaf-0", 1_600_000_000);
    write_file(root, "other/c.txt", "c", 1_600_000_000);

    let before = build(root, txt_rules());
    write_file(root, "a/b/leaf.txt", "leaf-1", 1_600_000_000);
    let after = build(root, txt_rules());

    let changes = diff(Some(&before), Some(&after));
    let mut modified: Vec<_> = changes.modified.iter().map(|n| n.path.as_str()).collect();
    modified.sort();
    assert_eq!(modified, vec![".", "a", "a/b", "a/b/leaf.txt"]);
    assert!(changes.added.is_empty());
    assert!(changes.removed.is_empty());
}

/// Test that touching a file without changing its bytes is a modification
#[test]
fn test_touch_is_detected() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "a.txt", "same", 1_600_000_000);

    let before = build(root, txt_rules());
    write_file(root, "a.txt", "same", 1_600_000_060);
    let after = build(root, txt_rules());

    let changes = diff(Some(&before), Some(&after));
    assert!(changes
        .modified
        .iter()
        .any(|n| n.kind == NodeKind::Blob && n.path == "a.txt"));
}

/// Test that files outside the allow-list or under ignored names never appear
#[test]
fn test_filtering_excludes_disallowed_and_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "keep.txt", "k", 1_600_000_000);
    write_file(root, "skip.bin", "s", 1_600_000_000);
    write_file(root, "target/build.txt", "t", 1_600_000_000);
    fs::create_dir_all(root.join("empty")).unwrap();

    let tree = build(root, TrackingRules::new([".txt"], ["target"]));
    let files: Vec<_> = tree.files().iter().map(|n| n.path.clone()).collect();
    assert_eq!(files, vec!["keep.txt"]);
    assert_eq!(tree.children.len(), 1);
}

/// Test that an empty working directory builds the empty-hash root
#[test]
fn test_nothing_tracked_builds_empty_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "only.bin", "b", 1_600_000_000);

    let tree = build(temp_dir.path(), txt_rules());
    assert!(tree.is_empty_snapshot());
    assert_eq!(tree.path, ".");
}
