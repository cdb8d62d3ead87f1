//! Route, header, and query names shared by the sync client and server.

pub const ROUTE_HEAD: &str = "head";
pub const ROUTE_TREE: &str = "tree";
pub const ROUTE_PULL: &str = "pull";
pub const ROUTE_PUSH: &str = "push";
pub const ROUTE_CLONE: &str = "clone";

/// Query parameter carrying the client's HEAD on `/head`
pub const QUERY_HEAD: &str = "head";

/// Comma-joined paths removed on the server since the client's snapshot
pub const HEADER_REMOVED: &str = "Removed";
/// Comma-joined tracked extensions
pub const HEADER_CONFIG_EXT: &str = "Config-Ext";
/// Comma-joined ignored names
pub const HEADER_CONFIG_IGNORE: &str = "Config-Ignore";

pub const CONTENT_TYPE_ZIP: &str = "application/zip";

/// Join header values with commas.
pub fn join_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a comma-joined header value, dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
