// Output formatting: terminal display and per-section JSON dumps.

pub mod json;
pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "…" if truncated.
///
/// Unlike byte slicing (`&text[..120]`), this respects UTF-8 character boundaries
/// and will never panic on multi-byte characters like emoji or accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_short() {
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn test_truncate_chars_emoji() {
        assert_eq!(truncate_chars("🦀🦀🦀", 2), "🦀🦀…");
    }
}
