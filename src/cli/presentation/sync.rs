//! Sync command formatters: clone, pull, push.

use crate::sync::{CloneReport, PullReport, PushReport};

pub fn format_clone_report(report: &CloneReport) -> String {
    format!(
        "Cloned {} file(s) into {} at {}",
        report.files.len(),
        report.destination.display(),
        display_head(&report.head)
    )
}

pub fn format_pull_report(report: &PullReport) -> String {
    if report.up_to_date {
        return format!("Already up to date at {}", display_head(&report.head));
    }
    let mut lines = vec![format!(
        "Pulled {} file(s), removed {} path(s); now at {}",
        report.received.len(),
        report.removed.len(),
        display_head(&report.head)
    )];
    lines.extend(report.received.iter().map(|path| format!("  + {}", path)));
    lines.extend(report.removed.iter().map(|path| format!("  - {}", path)));
    lines.join("\n")
}

pub fn format_push_report(report: &PushReport) -> String {
    if report.up_to_date {
        return "Remote already up to date.".to_string();
    }
    if report.sent.is_empty() {
        return "Remote needs no files.".to_string();
    }
    let mut lines = vec![format!("Pushed {} file(s)", report.sent.len())];
    lines.extend(report.sent.iter().map(|path| format!("  > {}", path)));
    lines.join("\n")
}

fn display_head(head: &str) -> &str {
    if head.is_empty() {
        "(empty)"
    } else {
        head
    }
}
