//! Content-addressed snapshot tree
//!
//! Represents a tracked working directory as a Merkle-like tree: each file
//! node carries a digest of its content and metadata, and each directory
//! node carries a digest of its children's digests.

pub mod builder;
pub mod diff;
pub mod hasher;
pub mod node;
pub mod path;

pub use builder::{TrackingRules, TreeBuilder};
pub use diff::{diff, Changes};
pub use node::{Node, NodeKind};
