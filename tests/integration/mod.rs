//! Integration test modules

mod diff_properties;
mod local_workflow;
mod sync_clone_pull;
mod sync_push;
mod test_utils;
mod transfer_safety;
mod tree_determinism;
