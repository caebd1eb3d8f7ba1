//! Destination string handling.

use std::path::{Component, Path};

/// Splits `"bucket/sub/path"` into `("bucket", "sub/path")`.
///
/// The head is the bucket, the tail everything else. Without a separator the
/// tail is empty.
pub fn reverse_split(path: &str) -> (String, String) {
    match path.split_once('/') {
        Some((bucket, rest)) => (bucket.to_string(), rest.to_string()),
        None => (path.to_string(), String::new()),
    }
}

/// Joins a path relative to the source root onto the destination root.
///
/// Keys always use `/`, whatever the local separator is.
pub fn object_key(root: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        relative
    } else {
        format!("{root}/{relative}")
    }
}

/// Key prefix that covers everything uploaded under `root`.
///
/// An empty root covers the whole bucket.
pub fn folder_prefix(root: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        String::new()
    } else {
        format!("{root}/")
    }
}
