//! Local fallback estimate: ~4 characters per token.
//!
//! Used while no accurate count is available (first render, request in flight, or after a
//! failed request) so the usage indicator never reads 0% just because the tokenizer has not
//! answered yet.

/// Characters per token for the fallback heuristic.
pub const CHARS_PER_TOKEN: usize = 4;

/// Approximate token count for `text`.
///
/// Blank or whitespace-only text is 0; anything else is `ceil(chars / 4)`, at least 1.
pub fn fallback_estimate(text: &str) -> u32 {
    if text.trim().is_empty() {
        return 0;
    }
    let chars = text.chars().count();
    let tokens = chars.div_ceil(CHARS_PER_TOKEN).max(1);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_zero() {
        assert_eq!(fallback_estimate(""), 0);
        assert_eq!(fallback_estimate("   \n\t "), 0);
    }

    #[test]
    fn rounds_up_by_four() {
        assert_eq!(fallback_estimate("a"), 1);
        assert_eq!(fallback_estimate("abcd"), 1);
        assert_eq!(fallback_estimate("abcde"), 2);
        assert_eq!(fallback_estimate(&"x".repeat(40)), 10);
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 4 chars, 12 bytes.
        assert_eq!(fallback_estimate("日本語だ"), 1);
    }

    #[test]
    fn non_blank_is_at_least_one() {
        for s in [" a ", "\n.\n", "hello", "  x"] {
            assert!(fallback_estimate(s) >= 1, "{s:?}");
        }
    }

    #[test]
    fn whitespace_counts_toward_length_once_non_blank() {
        // 8 chars including padding.
        assert_eq!(fallback_estimate("   ab   "), 2);
    }
}
