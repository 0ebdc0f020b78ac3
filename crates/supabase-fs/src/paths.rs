//! Object key helpers
//!
//! The remote store has a flat key space; everything directory-like is
//! derived from slash-delimited keys here.

/// Name of the zero-byte object that keeps an otherwise empty prefix listable
pub const EMPTY_FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Join key segments with single slashes.
///
/// Leading and trailing slashes are trimmed from every segment and empty
/// segments are dropped, so `join_paths(&["a/", "/b/", "", "c"])` is `a/b/c`.
pub fn join_paths<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parent prefix of a key, `None` for keys at the bucket root
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let (dir, _) = trimmed.rsplit_once('/')?;
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        None
    } else {
        Some(dir)
    }
}

/// Last segment of a key
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, name)) => name,
        None => trimmed,
    }
}

/// Whether the key names a placeholder object
pub fn is_placeholder(path: &str) -> bool {
    basename(path) == EMPTY_FOLDER_PLACEHOLDER
}

/// Key of the placeholder object sitting next to `path`
pub fn sibling_placeholder(path: &str) -> String {
    match parent(path) {
        Some(dir) => join_paths(&[dir, EMPTY_FOLDER_PLACEHOLDER]),
        None => EMPTY_FOLDER_PLACEHOLDER.to_string(),
    }
}
