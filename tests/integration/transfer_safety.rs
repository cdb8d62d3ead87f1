//! Integration tests for archive handling at the HTTP boundary

use crate::integration::test_utils::{txt_rules, write_file, TestServer};
use std::io::{Cursor, Write};
use tinyvcs::workspace::Workspace;
use tempfile::TempDir;
use zip::write::FullFileOptions;
use zip::ZipWriter;

fn crafted_archive(name: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(name, FullFileOptions::default()).unwrap();
    zip.write_all(b"payload").unwrap();
    zip.finish().unwrap().into_inner()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_push_with_escaping_entry_is_rejected() {
    let parent = TempDir::new().unwrap();
    let server_root = parent.path().join("served");
    write_file(&server_root, "x.txt", "x", 1_650_000_000);
    Workspace::new(&server_root).init(&txt_rules()).unwrap();

    let server = TestServer::start(&server_root).await;
    let response = reqwest::Client::new()
        .post(format!("{}/push", server.base))
        .body(crafted_archive("../evil.txt"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert!(!parent.path().join("evil.txt").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_push_with_garbage_body_is_rejected() {
    let server_dir = TempDir::new().unwrap();
    Workspace::new(server_dir.path()).init(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/push", server.base))
        .body(vec![b'x'; 512])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_archive_carries_removed_header() {
    let server_dir = TempDir::new().unwrap();
    write_file(server_dir.path(), "a.txt", "a", 1_650_000_000);
    write_file(server_dir.path(), "b.txt", "b", 1_650_000_000);
    let server_ws = Workspace::new(server_dir.path());
    server_ws.init(&txt_rules()).unwrap();

    // A client that still has `gone.txt` and lacks `b.txt`.
    let client_dir = TempDir::new().unwrap();
    write_file(client_dir.path(), "a.txt", "a", 1_650_000_000);
    write_file(client_dir.path(), "gone.txt", "g", 1_650_000_000);
    let client_tree = Workspace::new(client_dir.path()).snapshot(&txt_rules()).unwrap();

    let server = TestServer::start(server_dir.path()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/pull", server.base))
        .json(&client_tree)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["Removed"], "gone.txt");
    assert_eq!(response.headers()["Config-Ext"], ".txt");
    let body = response.bytes().await.unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive.by_index(0).unwrap().name(), "b.txt");
}
