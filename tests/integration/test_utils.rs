//! Shared test utilities for integration tests
//!
//! Spins up an in-process sync server on an ephemeral port and provides
//! small filesystem helpers.

use filetime::FileTime;
use std::fs;
use std::path::Path;
use tinyvcs::config::ClientConfig;
use tinyvcs::sync::{Remote, RemoteParams, SyncClient, SyncServer};
use tinyvcs::tree::TrackingRules;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A server running on 127.0.0.1 until the guard is dropped
pub struct TestServer {
    pub base: String,
    token: CancellationToken,
}

impl TestServer {
    pub async fn start(root: &Path) -> Self {
        let token = CancellationToken::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(SyncServer::new(root, token.clone()).serve(listener));
        Self {
            base: format!("http://{}", addr),
            token,
        }
    }

    pub fn client(&self) -> SyncClient {
        let remote = Remote::parse(&self.base, RemoteParams::default()).unwrap();
        SyncClient::new(remote, &ClientConfig::default()).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub fn txt_rules() -> TrackingRules {
    TrackingRules::new([".txt"], Vec::<String>::new())
}

/// Write `content` to `root/relative` and pin its mtime to `unix_secs`.
pub fn write_file(root: &Path, relative: &str, content: &str, unix_secs: i64) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

pub fn mtime_secs(path: &Path) -> i64 {
    FileTime::from_last_modification_time(&fs::metadata(path).unwrap()).unix_seconds()
}
