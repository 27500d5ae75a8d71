//! Repository path shape predicates.
//!
//! These helpers replace pattern matching on raw strings with small,
//! explicit checks that can be reused by every classification rule.

/// Returns the final segment of a repository path.
///
/// Trailing content after the last `/` is returned as-is, so a path ending
/// in `/` yields an empty segment.
///
/// # Examples
///
/// ```
/// use chronicle_core::path::last_segment;
///
/// assert_eq!(last_segment("/content/dam/app/photo.jpg"), "photo.jpg");
/// assert_eq!(last_segment("photo.jpg"), "photo.jpg");
/// assert_eq!(last_segment("/content/dam/"), "");
/// ```
#[must_use]
pub fn last_segment(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, segment)| segment)
}

/// Returns true if the path's final segment carries a file extension.
///
/// The segment must have at least one character before a dot, and the text
/// after the last dot must be one or more ASCII alphanumerics. The path must
/// also contain at least one `/`, which rejects bare names.
///
/// # Examples
///
/// ```
/// use chronicle_core::path::has_file_extension;
///
/// assert!(has_file_extension("/content/dam/app/photo.jpg"));
/// assert!(has_file_extension("/content/dam/app/archive.tar.gz"));
/// assert!(!has_file_extension("/content/dam/app/folder"));
/// assert!(!has_file_extension("/content/dam/app/.hidden"));
/// assert!(!has_file_extension("/content/dam/app/photo."));
/// assert!(!has_file_extension("/content/dam/app/photo.jp-g"));
/// ```
#[must_use]
pub fn has_file_extension(path: &str) -> bool {
    let Some((_, segment)) = path.rsplit_once('/') else {
        return false;
    };

    // Backtrack over the dots the same way a greedy `[^/]+\.[a-zA-Z0-9]+$`
    // would: the extension is the alphanumeric run after the last dot.
    match segment.rsplit_once('.') {
        Some((stem, extension)) => {
            !stem.is_empty()
                && !extension.is_empty()
                && extension.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Returns true if the path contains any of the given substrings.
#[must_use]
pub fn contains_any<S: AsRef<str>>(path: &str, needles: &[S]) -> bool {
    needles.iter().any(|needle| path.contains(needle.as_ref()))
}
