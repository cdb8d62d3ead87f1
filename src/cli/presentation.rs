//! CLI presentation: text and json formatters per command family.

mod local;
mod sync;

pub use local::{
    format_commit_result, format_init_result, format_show_result, format_status_result,
    StatusSummary,
};
pub use sync::{format_clone_report, format_pull_report, format_push_report};
