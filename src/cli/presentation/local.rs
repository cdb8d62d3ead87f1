//! Local command formatters: init, status, commit, show.

use crate::error::CommandError;
use crate::store::Versioning;
use crate::tree::{Changes, Node, NodeKind};
use crate::workspace::WorkspaceState;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::BTreeSet;

/// File-level view of `Changes` for display.
///
/// Directories that were added or removed whole are expanded into their
/// files; modified directories are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl StatusSummary {
    pub fn from_changes(changes: &Changes) -> Self {
        Self {
            modified: file_paths(changes.modified.iter().filter(|node| node.is_blob())),
            added: file_paths(changes.added.iter().flat_map(|node| node.files())),
            removed: file_paths(changes.removed.iter().flat_map(|node| node.files())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

fn file_paths<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<String> {
    nodes
        .map(|node| node.path.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn format_init_result(record: &Versioning) -> String {
    let files = record.tree.files().len();
    if record.head.is_empty() {
        format!(
            "Initialized empty snapshot (tracking {})",
            record.extensions.join(", ")
        )
    } else {
        format!(
            "Initialized snapshot {} with {} file(s) (tracking {})",
            short_hash(&record.head),
            files,
            record.extensions.join(", ")
        )
    }
}

pub fn format_status_result(
    changes: Option<&Changes>,
    format: &str,
    color: bool,
) -> Result<String, CommandError> {
    let summary = changes.map(StatusSummary::from_changes).unwrap_or_default();

    if format == "json" {
        return Ok(serde_json::to_string_pretty(&summary)?);
    }
    if summary.is_empty() {
        return Ok("No changes.".to_string());
    }

    let mut lines = Vec::new();
    for (label, paths) in [
        ("modified", &summary.modified),
        ("added", &summary.added),
        ("removed", &summary.removed),
    ] {
        for path in paths {
            let tag = format!("{:>9}:", label);
            let tag = if !color {
                tag
            } else {
                match label {
                    "modified" => tag.yellow().to_string(),
                    "added" => tag.green().to_string(),
                    _ => tag.red().to_string(),
                }
            };
            lines.push(format!("{} {}", tag, path));
        }
    }
    Ok(lines.join("\n"))
}

pub fn format_commit_result(record: Option<&Versioning>) -> String {
    match record {
        None => "Nothing to commit.".to_string(),
        Some(record) if record.head.is_empty() => {
            "Committed empty snapshot (no tracked files remain)".to_string()
        }
        Some(record) => format!(
            "Committed snapshot {} ({} file(s))",
            short_hash(&record.head),
            record.tree.files().len()
        ),
    }
}

/// JSON shape of `show`: the record with the computed state alongside.
#[derive(Serialize)]
struct ShowView<'a> {
    state: WorkspaceState,
    #[serde(flatten)]
    record: &'a Versioning,
}

pub fn format_show_result(
    record: &Versioning,
    state: WorkspaceState,
    format: &str,
    color: bool,
) -> Result<String, CommandError> {
    if format == "json" {
        return Ok(serde_json::to_string_pretty(&ShowView { state, record })?);
    }

    let title = "Snapshot";
    let mut out = vec![
        if color {
            format!("{}", title.bold().underline())
        } else {
            title.to_string()
        },
        format!("  HEAD: {}", if record.head.is_empty() { "(empty)" } else { record.head.as_str() }),
        format!("  State: {}", state_label(state)),
        format!("  Extensions: {}", record.extensions.join(", ")),
        format!("  Ignored: {}", record.ignored.join(", ")),
    ];
    if record.tree.is_empty_snapshot() {
        return Ok(out.join("\n"));
    }

    out.push(String::new());
    for (depth, node) in record.tree.walk() {
        let marker = match node.kind {
            NodeKind::Tree => "/",
            NodeKind::Blob => "",
        };
        out.push(format!(
            "{}{}{}  {}",
            "  ".repeat(depth),
            node.path,
            marker,
            short_hash(&node.hash)
        ));
    }
    Ok(out.join("\n"))
}

fn state_label(state: WorkspaceState) -> &'static str {
    match state {
        WorkspaceState::Uninitialized => "uninitialized",
        WorkspaceState::Clean => "clean",
        WorkspaceState::Dirty => "dirty",
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
