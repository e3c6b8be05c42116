//! `*` wildcard matching.
//!
//! The grammar is minimal: `*` matches zero or more characters and every other character
//! matches itself, case-sensitively. There is no escaping and no single-character wildcard.

/// Match `text` against a wildcard `pattern`.
///
/// ## Parameters
/// - `pattern`: the wildcard expression (`*` is the only meta character).
/// - `text`: the candidate name.
///
/// ## Returns
/// - (`bool`): `true` if the whole of `text` matches the whole of `pattern`.
///
/// ## Notes
/// - Runs in `O(pattern.len() * text.len())` worst case with no allocation (greedy star with a single
///   backtrack point).
/// - Works on bytes: UTF-8 is self-synchronizing, so a byte-level match of literal runs is a char-level match.
///
/// ## Examples
/// ```rust
/// use isorun_core::wildcard_match;
/// assert!(wildcard_match("*", "anything"));
/// assert!(wildcard_match("pkg.*Test", "pkg.FooTest"));
/// assert!(!wildcard_match("pkg.*", "other.Foo"));
/// ```
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();

    let (mut pi, mut ti) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star_pi, star_ti)) = star {
            // Let the last star absorb one more byte and retry.
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&b| b == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_alone_matches_everything() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("*", "pkg.Foo"));
        assert!(wildcard_match("**", "pkg.Foo"));
    }

    #[test]
    fn test_literal_is_exact_and_case_sensitive() {
        assert!(wildcard_match("pkg.Foo", "pkg.Foo"));
        assert!(!wildcard_match("pkg.Foo", "pkg.foo"));
        assert!(!wildcard_match("pkg.Foo", "pkg.FooBar"));
        assert!(!wildcard_match("pkg.FooBar", "pkg.Foo"));
    }

    #[test]
    fn test_empty_pattern_only_matches_empty_text() {
        assert!(wildcard_match("", ""));
        assert!(!wildcard_match("", "a"));
    }

    #[test]
    fn test_star_positions() {
        assert!(wildcard_match("test*", "testAdd"));
        assert!(wildcard_match("*Test", "AddTest"));
        assert!(wildcard_match("*Add*", "testAddition"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn test_backtracking() {
        assert!(wildcard_match("*ab", "aab"));
        assert!(wildcard_match("*aab", "aaab"));
        assert!(wildcard_match("a*a*a", "aaaa"));
        assert!(!wildcard_match("a*a*a", "aa"));
    }

    #[test]
    fn test_question_mark_is_literal() {
        assert!(wildcard_match("test?", "test?"));
        assert!(!wildcard_match("test?", "testA"));
    }

    #[test]
    fn test_multibyte_names() {
        assert!(wildcard_match("pkg.*é", "pkg.Café"));
        assert!(wildcard_match("*ü*", "Grüße"));
        assert!(!wildcard_match("*ü", "Grüße"));
    }

    #[test]
    fn test_parameterized_labels() {
        assert!(wildcard_match("testFib*", "testFib[0]"));
        assert!(wildcard_match("*[1]", "testFib[1]"));
    }
}
