//! tinyvcs: Snapshot Version Control with HTTP Sync
//!
//! Snapshots a directory into a content-addressed tree, detects changes
//! against the last stored snapshot, and synchronizes snapshots and file
//! contents between a client and a server over HTTP.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod sync;
pub mod transfer;
pub mod tree;
pub mod workspace;
