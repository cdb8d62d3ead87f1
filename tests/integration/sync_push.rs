//! Integration tests for push against an in-process server

use crate::integration::test_utils::{mtime_secs, txt_rules, write_file, TestServer};
use std::fs;
use tinyvcs::tree::TrackingRules;
use tinyvcs::workspace::{Workspace, WorkspaceState};
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread")]
async fn test_push_scenario() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "x.txt", "x content", 1_650_000_000);
    let server_ws = Workspace::new(server_dir.path());
    server_ws.init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let client = server.client();
    client.clone_into(client_dir.path()).await.unwrap();

    let client_ws = Workspace::new(client_dir.path());
    write_file(client_dir.path(), "nested/z.txt", "z content", 1_650_000_200);
    let client_record = client_ws.commit(&TrackingRules::default()).unwrap().unwrap();

    let report = client.push(&client_ws).await.unwrap();
    assert!(!report.up_to_date);
    assert_eq!(report.sent, vec!["nested/z.txt"]);

    let pushed = server_dir.path().join("nested").join("z.txt");
    assert_eq!(fs::read_to_string(&pushed).unwrap(), "z content");
    assert_eq!(mtime_secs(&pushed), 1_650_000_200);

    // Pushed files land in the working directory only; the server's snapshot
    // moves on its own commit.
    assert_eq!(server_ws.state().unwrap(), WorkspaceState::Dirty);
    let server_record = server_ws.commit(&TrackingRules::default()).unwrap().unwrap();
    assert_eq!(server_record.head, client_record.head);

    let again = client.push(&client_ws).await.unwrap();
    assert!(again.up_to_date);
    assert!(again.sent.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_push_sends_nothing_when_server_has_everything() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "x.txt", "x", 1_650_000_000);
    write_file(server_dir.path(), "extra.txt", "extra", 1_650_000_000);
    let server_ws = Workspace::new(server_dir.path());
    server_ws.init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let client = server.client();
    client.clone_into(client_dir.path()).await.unwrap();

    // Dropping a file locally makes the HEADs differ, but the server lacks nothing.
    let client_ws = Workspace::new(client_dir.path());
    fs::remove_file(client_dir.path().join("extra.txt")).unwrap();
    client_ws.commit(&TrackingRules::default()).unwrap().unwrap();

    let report = client.push(&client_ws).await.unwrap();
    assert!(!report.up_to_date);
    assert!(report.sent.is_empty());
    assert!(server_dir.path().join("extra.txt").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_push_modified_file_overwrites_server_copy() {
    let server_dir = TempDir::new().unwrap();
    let client_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "x.txt", "old", 1_650_000_000);
    Workspace::new(server_dir.path()).init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let client = server.client();
    client.clone_into(client_dir.path()).await.unwrap();

    let client_ws = Workspace::new(client_dir.path());
    write_file(client_dir.path(), "x.txt", "new", 1_650_000_300);
    client_ws.commit(&TrackingRules::default()).unwrap().unwrap();

    let report = client.push(&client_ws).await.unwrap();
    assert_eq!(report.sent, vec!["x.txt"]);
    assert_eq!(
        fs::read_to_string(server_dir.path().join("x.txt")).unwrap(),
        "new"
    );
}
