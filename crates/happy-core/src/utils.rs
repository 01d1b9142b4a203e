//! Small string helpers shared across crates.

/// Truncates `s` to at most `max_len` bytes, backing off to the nearest
/// preceding UTF-8 character boundary so the result is always valid UTF-8.
///
/// Used when logging entity previews (e.g. a truncated tool-call argument
/// summary) where the full content must never be logged but a short,
/// correctly-encoded excerpt is useful for debugging.
#[must_use]
pub fn truncate_to_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_than_max_is_unchanged() {
        assert_eq!(truncate_to_boundary("hello", 10), "hello");
    }

    #[test]
    fn truncates_ascii_at_exact_length() {
        assert_eq!(truncate_to_boundary("hello world", 5), "hello");
    }

    #[test]
    fn backs_off_to_char_boundary_on_multibyte_input() {
        let s = "héllo";
        // 'é' is 2 bytes; cutting at byte 2 would land mid-character.
        let truncated = truncate_to_boundary(s, 2);
        assert!(s.is_char_boundary(truncated.len()));
        assert_eq!(truncated, "h");
    }

    #[test]
    fn zero_max_len_yields_empty_string() {
        assert_eq!(truncate_to_boundary("anything", 0), "");
    }
}
