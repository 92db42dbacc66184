//! Text cleanup applied before anything is embedded.

/// Maximum number of characters handed to an embedder.
pub const MAX_INPUT_CHARS: usize = 8192;

/// Collapse whitespace runs, trim, and bound the text to [`MAX_INPUT_CHARS`].
///
/// An empty return value means there is nothing to embed.
pub fn normalize_text(text: &str) -> String {
    normalize_text_with_limit(text, MAX_INPUT_CHARS)
}

/// Like [`normalize_text`] with a caller-chosen character limit.
///
/// Truncation counts Unicode scalar values, never splits a character, and
/// never leaves a trailing space behind.
pub fn normalize_text_with_limit(text: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(text.len().min(max_chars));
    let mut chars = 0usize;

    for word in text.split_whitespace() {
        if chars > 0 {
            if chars + 1 > max_chars {
                break;
            }
            out.push(' ');
            chars += 1;
        }
        for ch in word.chars() {
            if chars == max_chars {
                return out.trim_end().to_string();
            }
            out.push(ch);
            chars += 1;
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(
            normalize_text("  Q4\tInvoice \n\n #123  "),
            "Q4 Invoice #123".to_string()
        );
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \t\r\n "), "");
    }

    #[test]
    fn truncates_to_limit() {
        let long = "a".repeat(MAX_INPUT_CHARS + 100);
        assert_eq!(normalize_text(&long).chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "héllo wörld";
        assert_eq!(normalize_text_with_limit(text, 4), "héll");
    }

    #[test]
    fn truncation_drops_dangling_separator() {
        assert_eq!(normalize_text_with_limit("abc   def", 4), "abc");
        assert_eq!(normalize_text_with_limit("abc def", 5), "abc d");
    }

    #[test]
    fn zero_limit_yields_empty() {
        assert_eq!(normalize_text_with_limit("anything", 0), "");
    }
}
