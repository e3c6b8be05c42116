//! Failure-trace normalization for the line-oriented output streams.
//!
//! A rendered trace spans many lines; every persisted format wants it on exactly one line and bounded
//! in size, so downstream tools can store it in a fixed-width column.

/// Upper bound, in UTF-8 bytes, of a normalized trace (unsigned 16-bit).
pub const MAX_TRACE_BYTES: usize = u16::MAX as usize;

/// Normalize a rendered failure trace for persistence.
///
/// ## Returns
/// - (`String`): the trace on a single line, at most [`MAX_TRACE_BYTES`] bytes long.
///
/// ## Notes
/// - See [`collapse_whitespace`] and [`truncate_utf8`] for the two steps.
/// - Empty input yields an empty string.
pub fn normalize_trace(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    truncate_utf8(&collapsed, MAX_TRACE_BYTES).to_string()
}

/// Put a multi-line text on one line.
///
/// Each newline, together with the spaces and carriage return before it and the spaces/tabs after it,
/// becomes a single space. Leading and trailing whitespace is then stripped.
///
/// ## Examples
/// ```rust
/// use isorun_core::trace::collapse_whitespace;
/// assert_eq!(
///     collapse_whitespace("boom\n\tat pkg.Foo.testB(Foo.java:12)\n"),
///     "boom at pkg.Foo.testB(Foo.java:12)"
/// );
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segments = text.split('\n').peekable();
    let mut first = true;

    while let Some(segment) = segments.next() {
        let mut segment = segment;
        if !first {
            out.push(' ');
            segment = segment.trim_start_matches([' ', '\t']);
        }
        if segments.peek().is_some() {
            segment = segment.strip_suffix('\r').unwrap_or(segment);
            segment = segment.trim_end_matches(' ');
        }
        out.push_str(segment);
        first = false;
    }

    out.trim_matches([' ', '\t', '\r', '\n']).to_string()
}

/// Truncate `text` to at most `max_bytes` bytes without splitting a character.
///
/// A trailing incomplete multi-byte sequence is dropped rather than reported.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_java_style_trace() {
        let trace = "java.lang.AssertionError: expected:<1> but was:<2>\n\
                     \tat org.junit.Assert.fail(Assert.java:88)\n\
                     \tat pkg.Foo.testB(Foo.java:12)\n";
        assert_eq!(
            collapse_whitespace(trace),
            "java.lang.AssertionError: expected:<1> but was:<2> at org.junit.Assert.fail(Assert.java:88) \
             at pkg.Foo.testB(Foo.java:12)"
        );
    }

    #[test]
    fn test_collapse_crlf_and_trailing_spaces() {
        assert_eq!(collapse_whitespace("a  \r\n   b\r\n"), "a b");
    }

    #[test]
    fn test_each_newline_becomes_one_space() {
        assert_eq!(collapse_whitespace("a\n\nb"), "a  b");
    }

    #[test]
    fn test_collapse_strips_outer_whitespace() {
        assert_eq!(collapse_whitespace("  \t boom \t "), "boom");
        assert_eq!(collapse_whitespace("\n\n"), "");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_collapse_keeps_inner_tabs() {
        assert_eq!(collapse_whitespace("a\tb"), "a\tb");
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_utf8("abc", 3), "abc");
        assert_eq!(truncate_utf8("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_drops_incomplete_char() {
        // "é" is two bytes; cutting after its first byte drops it entirely
        assert_eq!(truncate_utf8("aé", 2), "a");
        assert_eq!(truncate_utf8("aé", 3), "aé");
        // four-byte scalar
        assert_eq!(truncate_utf8("x😀", 4), "x");
    }

    #[test]
    fn test_normalize_bounds_length() {
        let long = "é".repeat(MAX_TRACE_BYTES);
        let normalized = normalize_trace(&long);
        assert!(normalized.len() <= MAX_TRACE_BYTES);
        assert_eq!(normalized.len() % 2, 0);
        assert!(normalized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_normalize_trace_over_twice_the_bound() {
        let long = format!("boom\n{}", "at frame\n".repeat(20_000));
        assert!(long.len() > 2 * MAX_TRACE_BYTES);
        let normalized = normalize_trace(&long);
        assert_eq!(normalized.len(), MAX_TRACE_BYTES);
        assert!(!normalized.contains('\n'));
    }
}
