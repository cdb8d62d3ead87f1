//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, RemoteArgs, RuleArgs};
pub use presentation::{
    format_clone_report, format_commit_result, format_init_result, format_pull_report,
    format_push_report, format_show_result, format_status_result, StatusSummary,
};
pub use route::RunContext;
