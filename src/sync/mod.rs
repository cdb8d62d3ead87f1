//! HTTP synchronization between a client working directory and a server.
//!
//! The server exposes `/head`, `/tree`, `/pull`, `/push`, and `/clone`; the
//! client drives them to implement clone, pull, and push.

pub mod client;
pub mod remote;
pub mod server;
pub mod wire;

pub use client::{CloneReport, PullReport, PushReport, SyncClient};
pub use remote::{Remote, RemoteParams};
pub use server::SyncServer;
