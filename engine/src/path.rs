//! Path utilities.
//!
//! Callers address the tree with slash notation (`/users/abc`) or dot
//! notation (`users.abc`). Internally every path is kept in canonical form:
//! dot-separated segments with no leading or trailing separator. The root is
//! the empty string.

use crate::error::{Error, Result};

/// Separator used by canonical paths.
pub const SEPARATOR: char = '.';

/// Characters a path segment may not contain.
const RESERVED: [char; 4] = ['#', '$', '[', ']'];

/// Convert slash or dot notation into canonical form.
pub fn normalize(path: &str) -> String {
    path.split(['/', SEPARATOR])
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Convert a path into slash notation. The root becomes `/`.
pub fn to_slashed(path: &str) -> String {
    format!("/{}", segments(path).join("/"))
}

/// Split a path into its segments. Accepts either notation.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['/', SEPARATOR])
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join a child path onto a base path.
pub fn join(base: &str, child: &str) -> String {
    let mut parts = segments(base);
    parts.extend(segments(child));
    parts.join(".")
}

/// Parent of a path, or `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    let parts = segments(path);
    if parts.is_empty() {
        return None;
    }
    Some(parts[..parts.len() - 1].join("."))
}

/// Last segment of a path, or `None` for the root.
pub fn leaf(path: &str) -> Option<&str> {
    segments(path).last().copied()
}

/// Whether `path` equals `ancestor` or lies underneath it.
///
/// Comparison is per segment, so `users2` is not within `users`.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    let path = segments(path);
    let ancestor = segments(ancestor);
    path.len() >= ancestor.len() && path.iter().zip(&ancestor).all(|(a, b)| a == b)
}

/// The part of `path` below `ancestor`, in canonical form.
///
/// Returns `None` when `path` is not within `ancestor`; an empty string when
/// both are the same location.
pub fn relative(path: &str, ancestor: &str) -> Option<String> {
    if !is_within(path, ancestor) {
        return None;
    }
    let skip = segments(ancestor).len();
    Some(segments(path)[skip..].join("."))
}

/// Reject paths containing reserved characters.
pub fn validate(path: &str) -> Result<()> {
    for segment in segments(path) {
        if segment.contains(RESERVED) {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                segment: segment.to_string(),
            });
        }
    }
    Ok(())
}
