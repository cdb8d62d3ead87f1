//! Integration tests for clone and pull against an in-process server

use crate::integration::test_utils::{mtime_secs, txt_rules, write_file, TestServer};
use std::fs;
use tinyvcs::error::{StorageError, SyncError};
use tinyvcs::tree::TrackingRules;
use tinyvcs::workspace::Workspace;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread")]
async fn test_clone_then_pull_scenario() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "x.txt", "x content", 1_650_000_000);
    let server_ws = Workspace::new(server_dir.path());
    let server_record = server_ws.init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let client = server.client();

    let report = client.clone_into(client_dir.path()).await.unwrap();
    assert_eq!(report.files, vec!["x.txt"]);
    assert_eq!(report.head, server_record.head);
    assert_eq!(
        fs::read_to_string(client_dir.path().join("x.txt")).unwrap(),
        "x content"
    );
    assert_eq!(mtime_secs(&client_dir.path().join("x.txt")), 1_650_000_000);

    let client_ws = Workspace::new(client_dir.path());
    let client_record = client_ws.load().unwrap();
    assert_eq!(client_record.head, server_record.head);
    assert_eq!(client_record.extensions, vec![".txt"]);

    write_file(server_dir.path(), "y.txt", "y content", 1_650_000_100);
    let server_record = server_ws.commit(&TrackingRules::default()).unwrap().unwrap();

    let pull = client.pull(&client_ws).await.unwrap();
    assert!(!pull.up_to_date);
    assert_eq!(pull.received, vec!["y.txt"]);
    assert!(pull.removed.is_empty());
    assert_eq!(pull.head, server_record.head);
    assert_eq!(
        fs::read_to_string(client_dir.path().join("y.txt")).unwrap(),
        "y content"
    );
    assert_eq!(client_ws.load().unwrap().head, server_record.head);

    let again = client.pull(&client_ws).await.unwrap();
    assert!(again.up_to_date);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_deletes_paths_removed_on_server() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "keep.txt", "keep", 1_650_000_000);
    write_file(server_dir.path(), "old/a.txt", "a", 1_650_000_000);
    write_file(server_dir.path(), "old/b.txt", "b", 1_650_000_000);
    let server_ws = Workspace::new(server_dir.path());
    server_ws.init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let client = server.client();
    client.clone_into(client_dir.path()).await.unwrap();
    assert!(client_dir.path().join("old/b.txt").exists());

    fs::remove_dir_all(server_dir.path().join("old")).unwrap();
    let server_record = server_ws.commit(&TrackingRules::default()).unwrap().unwrap();

    let client_ws = Workspace::new(client_dir.path());
    let pull = client.pull(&client_ws).await.unwrap();
    assert_eq!(pull.removed, vec!["old"]);
    assert!(pull.received.is_empty());
    assert!(!client_dir.path().join("old").exists());
    assert!(client_dir.path().join("keep.txt").exists());
    assert_eq!(client_ws.load().unwrap().head, server_record.head);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_skips_snapshot_files_missing_from_server_disk() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "x.txt", "x", 1_650_000_000);
    let server_ws = Workspace::new(server_dir.path());
    server_ws.init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let client = server.client();
    client.clone_into(client_dir.path()).await.unwrap();

    write_file(server_dir.path(), "y.txt", "y", 1_650_000_100);
    write_file(server_dir.path(), "z.txt", "z", 1_650_000_100);
    server_ws.commit(&TrackingRules::default()).unwrap().unwrap();
    fs::remove_file(server_dir.path().join("y.txt")).unwrap();

    let client_ws = Workspace::new(client_dir.path());
    let pull = client.pull(&client_ws).await.unwrap();
    assert_eq!(pull.received, vec!["z.txt"]);
    assert_eq!(
        fs::read_to_string(client_dir.path().join("z.txt")).unwrap(),
        "z"
    );
    assert!(!client_dir.path().join("y.txt").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clone_into_initialized_destination_fails() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "x.txt", "x", 1_650_000_000);
    Workspace::new(server_dir.path()).init(&txt_rules()).unwrap();
    Workspace::new(client_dir.path()).init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let err = server.client().clone_into(client_dir.path()).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Storage(StorageError::AlreadyInitialized(_))
    ));
    assert!(!client_dir.path().join("x.txt").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clone_from_uninitialized_server_is_remote_error() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let err = server.client().clone_into(client_dir.path()).await.unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 404, .. }));
}
