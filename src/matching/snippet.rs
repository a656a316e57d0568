// Short one-line previews of candidate content for dumps and the dashboard.

use crate::output::truncate_chars;

/// Default preview length in characters (SUMMARY_CHAR_LIMIT).
pub const DEFAULT_CHAR_LIMIT: usize = 280;

/// Collapse a candidate's content into a single-line preview.
///
/// Missing or blank content yields an empty string. Line breaks become
/// spaces, and the result is cut to `limit` characters with a trailing `…`.
pub fn summary_snippet(content: Option<&str>, limit: usize) -> String {
    let text = content.unwrap_or("").trim();
    if text.is_empty() {
        return String::new();
    }
    let flat = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    truncate_chars(&flat, limit)
}
