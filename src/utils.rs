//! Common utility functions used across the codebase.

/// Truncates a string to at most `max_chars` characters, adding "..." if truncated.
///
/// UTF-8 safe: respects character boundaries, so multi-byte characters never
/// cause a panic. `max_chars` includes the "..." suffix.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    const SUFFIX: &str = "...";

    // Fast path: byte length <= max_chars implies char count <= max_chars.
    if s.len() <= max_chars {
        return s.to_string();
    }
    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_string();
    }

    let suffix_len = SUFFIX.chars().count();
    if max_chars <= suffix_len {
        return SUFFIX.chars().take(max_chars).collect();
    }

    let truncated: String = s.chars().take(max_chars - suffix_len).collect();
    format!("{}{}", truncated, SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("", 5), "");
    }

    #[test]
    fn exact_length_passes_through() {
        assert_eq!(truncate_str("12345", 5), "12345");
    }

    #[test]
    fn long_strings_get_suffix() {
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("a".repeat(150).as_str(), 100).len(), 100);
    }

    #[test]
    fn multibyte_boundaries_are_respected() {
        assert_eq!(truncate_str("🦀🦀🦀🦀🦀", 4), "🦀...");
    }

    #[test]
    fn tiny_budget_degrades_to_partial_suffix() {
        assert_eq!(truncate_str("abcdef", 2), "..");
    }
}
