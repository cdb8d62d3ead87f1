//! Integration tests for init, status, and commit on one working directory

use crate::integration::test_utils::{txt_rules, write_file};
use std::fs;
use tinyvcs::error::StorageError;
use tinyvcs::tree::{NodeKind, TrackingRules};
use tinyvcs::workspace::{Workspace, WorkspaceState};
use tempfile::TempDir;

#[test]
fn test_init_status_commit_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "a.txt", "alpha", 1_600_000_000);
    write_file(root, "b.bin", "binary", 1_600_000_000);

    let workspace = Workspace::new(root);
    let record = workspace.init(&txt_rules()).unwrap();
    let files: Vec<_> = record.tree.files().iter().map(|n| n.path.clone()).collect();
    assert_eq!(files, vec!["a.txt"]);
    assert_eq!(workspace.state().unwrap(), WorkspaceState::Clean);

    write_file(root, "a.txt", "alpha, edited", 1_600_000_100);
    let changes = workspace.status(&TrackingRules::default()).unwrap().unwrap();
    let modified_files: Vec<_> = changes
        .modified
        .iter()
        .filter(|n| n.kind == NodeKind::Blob)
        .map(|n| n.path.as_str())
        .collect();
    assert_eq!(modified_files, vec!["a.txt"]);
    assert!(changes.modified_root().is_some());
    assert!(changes.added.is_empty());
    assert!(changes.removed.is_empty());
    assert_eq!(workspace.state().unwrap(), WorkspaceState::Dirty);

    let committed = workspace.commit(&TrackingRules::default()).unwrap().unwrap();
    assert_ne!(committed.head, record.head);
    assert!(workspace.status(&TrackingRules::default()).unwrap().is_none());
    assert_eq!(workspace.state().unwrap(), WorkspaceState::Clean);
}

#[test]
fn test_disallowed_file_edits_are_invisible() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "a.txt", "alpha", 1_600_000_000);
    write_file(root, "b.bin", "binary", 1_600_000_000);

    let workspace = Workspace::new(root);
    workspace.init(&txt_rules()).unwrap();
    write_file(root, "b.bin", "binary, edited", 1_600_000_500);

    assert!(workspace.status(&TrackingRules::default()).unwrap().is_none());
}

#[test]
fn test_commit_after_removing_everything_stores_empty_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "docs/a.txt", "alpha", 1_600_000_000);

    let workspace = Workspace::new(root);
    workspace.init(&txt_rules()).unwrap();
    fs::remove_dir_all(root.join("docs")).unwrap();

    let changes = workspace.status(&TrackingRules::default()).unwrap().unwrap();
    assert_eq!(changes.removed_paths(), vec!["."]);

    let record = workspace.commit(&TrackingRules::default()).unwrap().unwrap();
    assert_eq!(record.head, "");
    assert!(record.tree.is_empty_snapshot());

    write_file(root, "c.txt", "again", 1_600_000_000);
    let changes = workspace.status(&TrackingRules::default()).unwrap().unwrap();
    assert_eq!(changes.transfer_paths().into_iter().collect::<Vec<_>>(), vec!["c.txt"]);
}

#[test]
fn test_extra_rules_are_merged_on_commit() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "a.txt", "alpha", 1_600_000_000);
    write_file(root, "notes.md", "notes", 1_600_000_000);

    let workspace = Workspace::new(root);
    workspace.init(&txt_rules()).unwrap();
    let record = workspace
        .commit(&TrackingRules::new([".md"], Vec::<String>::new()))
        .unwrap()
        .unwrap();

    assert!(record.extensions.iter().any(|ext| ext == ".md"));
    assert_eq!(record.tree.files().len(), 2);
    assert_eq!(workspace.show().unwrap(), record);
}

#[test]
fn test_second_init_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());
    workspace.init(&txt_rules()).unwrap();

    let err = workspace.init(&txt_rules()).unwrap_err();
    assert!(matches!(err, StorageError::AlreadyInitialized(_)));
}

#[test]
fn test_status_without_record_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path());

    assert_eq!(workspace.state().unwrap(), WorkspaceState::Uninitialized);
    let err = workspace.status(&TrackingRules::default()).unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}
