// File: src/path.rs
// Purpose: Pure URL path validation, normalization, and splitting helpers

use std::borrow::Cow;

/// Validates if a URL path is in canonical form
///
/// # Rules
///
/// - Must start with `/`
/// - Must not contain `//`
/// - Must not end with `/` (except root `/`)
/// - Must not be empty
///
/// # Examples
///
/// ```
/// use waypoint_router::path::is_canonical_path;
///
/// assert!(is_canonical_path("/"));
/// assert!(is_canonical_path("/users/123"));
///
/// assert!(!is_canonical_path(""));
/// assert!(!is_canonical_path("users")); // Missing leading /
/// assert!(!is_canonical_path("/users/")); // Trailing /
/// assert!(!is_canonical_path("/users//123")); // Double //
/// ```
pub fn is_canonical_path(path: &str) -> bool {
    if path.is_empty() || !path.starts_with('/') {
        return false;
    }
    if path.contains("//") {
        return false;
    }
    if path == "/" {
        return true;
    }
    !path.ends_with('/')
}

/// Normalizes a URL path to canonical form
///
/// Returns `Cow::Borrowed` when the input is already canonical (zero
/// allocations), `Cow::Owned` otherwise.
///
/// Handles trailing slashes (`/users/` → `/users`), duplicate slashes
/// (`/a//b` → `/a/b`), and missing leading slashes (`users` → `/users`).
///
/// # Examples
///
/// ```
/// use waypoint_router::path::normalize_path;
/// use std::borrow::Cow;
///
/// let path = normalize_path("/users");
/// assert!(matches!(path, Cow::Borrowed("/users")));
///
/// assert_eq!(normalize_path("/users/"), "/users");
/// assert_eq!(normalize_path("/a//b///c"), "/a/b/c");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_canonical_path(path) {
        return Cow::Borrowed(path);
    }

    let normalized = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", normalized))
    }
}

/// Splits a URL into its path and search parts
///
/// The search part keeps its leading `?` so it can be re-appended verbatim.
/// An absent query string yields an empty search.
///
/// # Examples
///
/// ```
/// use waypoint_router::path::split_search;
///
/// assert_eq!(split_search("/users/42?tab=posts"), ("/users/42", "?tab=posts"));
/// assert_eq!(split_search("/users/42"), ("/users/42", ""));
/// ```
pub fn split_search(url: &str) -> (&str, &str) {
    match url.find('?') {
        Some(idx) => (&url[..idx], &url[idx..]),
        None => (url, ""),
    }
}

/// Splits a canonical path into its non-empty segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
