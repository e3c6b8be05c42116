//! Name patterns selecting test cases.
//!
//! A pattern expression is `<container wildcard>::<case wildcard>`; either half may be omitted and then
//! defaults to `*`. Patterns are compiled once at startup, so a malformed expression is a configuration
//! error and never surfaces while matching.

use isorun_core::conventions::CASE_SEPARATOR;
use isorun_core::wildcard_match;
use miette::Diagnostic;
use thiserror::Error;

use crate::id::TestIdentifier;

const MATCH_ALL: &str = "*";

/// Errors produced when compiling a pattern expression.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum PatternError {
    #[error("empty name pattern")]
    #[diagnostic(code(isorun::pattern::empty), help("use `*` to select everything"))]
    Empty,

    #[error("name pattern '{0}' contains more than one `::` separator")]
    #[diagnostic(
        code(isorun::pattern::too_many_separators),
        help("a pattern is `<container>::<case>`, e.g. `pkg.*Test::test*`")
    )]
    TooManySeparators(String),
}

/// A compiled `(container, case)` wildcard pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    container: String,
    case: String,
}

impl NamePattern {
    /// Compile a single pattern expression.
    pub fn compile(expr: &str) -> Result<Self, PatternError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(PatternError::Empty);
        }

        let (container, case) = match expr.split_once(CASE_SEPARATOR) {
            Some((_, rest)) if rest.contains(CASE_SEPARATOR) => {
                return Err(PatternError::TooManySeparators(expr.to_string()));
            }
            Some((container, case)) => (container, case),
            None => (expr, MATCH_ALL),
        };

        Ok(Self {
            container: or_match_all(container),
            case: or_match_all(case),
        })
    }

    /// A pattern matching every identifier (`*::*`).
    pub fn match_all() -> Self {
        Self {
            container: MATCH_ALL.to_string(),
            case: MATCH_ALL.to_string(),
        }
    }

    /// Check both halves independently.
    pub fn matches(&self, container: &str, case: &str) -> bool {
        wildcard_match(&self.container, container) && wildcard_match(&self.case, case)
    }

    pub fn matches_id(&self, id: &TestIdentifier) -> bool {
        self.matches(id.container(), id.case())
    }

    pub fn container_pattern(&self) -> &str {
        &self.container
    }

    pub fn case_pattern(&self) -> &str {
        &self.case
    }
}

fn or_match_all(half: &str) -> String {
    let half = half.trim();
    if half.is_empty() { MATCH_ALL.to_string() } else { half.to_string() }
}

/// An ordered collection of patterns combined with logical OR.
///
/// The empty set matches nothing, which is how "exclude nothing" is expressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<NamePattern>,
}

impl PatternSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A set holding only `*::*`.
    pub fn match_all() -> Self {
        Self {
            patterns: vec![NamePattern::match_all()],
        }
    }

    /// Compile a comma-separated list of expressions; blank entries are skipped.
    pub fn parse_list(expr: &str) -> Result<Self, PatternError> {
        Self::compile_all(expr.split(','))
    }

    /// Compile one expression per line; blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Result<Self, PatternError> {
        Self::compile_all(text.lines().filter(|line| !line.trim_start().starts_with('#')))
    }

    /// Compile every non-blank expression of an iterator.
    pub fn compile_all<'a>(exprs: impl IntoIterator<Item = &'a str>) -> Result<Self, PatternError> {
        let patterns = exprs
            .into_iter()
            .filter(|expr| !expr.trim().is_empty())
            .map(NamePattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn push(&mut self, pattern: NamePattern) {
        self.patterns.push(pattern);
    }

    pub fn extend(&mut self, other: PatternSet) {
        self.patterns.extend(other.patterns);
    }

    pub fn matches(&self, container: &str, case: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(container, case))
    }

    pub fn matches_id(&self, id: &TestIdentifier) -> bool {
        self.matches(id.container(), id.case())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamePattern> {
        self.patterns.iter()
    }
}

impl From<NamePattern> for PatternSet {
    fn from(pattern: NamePattern) -> Self {
        Self {
            patterns: vec![pattern],
        }
    }
}

impl FromIterator<NamePattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = NamePattern>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ========================================
    // NamePattern
    // ========================================

    #[test]
    fn test_compile_both_halves() {
        let p = NamePattern::compile("pkg.*::test*").unwrap();
        assert_eq!(p.container_pattern(), "pkg.*");
        assert_eq!(p.case_pattern(), "test*");
        assert!(p.matches("pkg.Foo", "testA"));
        assert!(!p.matches("pkg.Foo", "checkA"));
        assert!(!p.matches("other.Foo", "testA"));
    }

    #[test]
    fn test_absent_case_half_defaults_to_star() {
        let p = NamePattern::compile("pkg.Foo").unwrap();
        assert_eq!(p.case_pattern(), "*");
        assert!(p.matches("pkg.Foo", "anything"));
    }

    #[test]
    fn test_empty_halves_default_to_star() {
        let p = NamePattern::compile("::testA").unwrap();
        assert_eq!(p.container_pattern(), "*");
        assert!(p.matches("any.Container", "testA"));

        let p = NamePattern::compile("pkg.Foo::").unwrap();
        assert_eq!(p.case_pattern(), "*");
    }

    #[test]
    fn test_star_alone_matches_everything() {
        let p = NamePattern::compile("*").unwrap();
        assert!(p.matches("pkg.Foo", "testA"));
        assert!(p.matches("", ""));
    }

    #[test]
    fn test_too_many_separators_is_an_error() {
        assert_eq!(
            NamePattern::compile("a::b::c"),
            Err(PatternError::TooManySeparators("a::b::c".to_string()))
        );
    }

    #[test]
    fn test_blank_expression_is_an_error() {
        assert_eq!(NamePattern::compile("   "), Err(PatternError::Empty));
    }

    #[test]
    fn test_single_colon_is_literal() {
        let p = NamePattern::compile("pkg.Foo:testA").unwrap();
        assert_eq!(p.case_pattern(), "*");
        assert!(p.matches("pkg.Foo:testA", "x"));
        assert!(!p.matches("pkg.Foo", "testA"));
    }

    // ========================================
    // PatternSet
    // ========================================

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = PatternSet::empty();
        assert!(!set.matches("pkg.Foo", "testA"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_is_logical_or() {
        let set = PatternSet::parse_list("pkg.A::*, pkg.B::testX").unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches("pkg.A", "whatever"));
        assert!(set.matches("pkg.B", "testX"));
        assert!(!set.matches("pkg.B", "testY"));
    }

    #[test]
    fn test_parse_list_skips_blank_entries() {
        let set = PatternSet::parse_list("pkg.A::*,,pkg.B::*,").unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_lines_skips_comments() {
        let text = "# flaky tests\npkg.Flaky::*\n\n  \npkg.Slow::testBig\n";
        let set = PatternSet::from_lines(text).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches("pkg.Flaky", "testA"));
    }

    #[test]
    fn test_list_error_surfaces_at_compile_time() {
        assert!(matches!(
            PatternSet::parse_list("pkg.A::*,x::y::z"),
            Err(PatternError::TooManySeparators(_))
        ));
    }

    #[test]
    fn test_matches_id() {
        let set = PatternSet::match_all();
        assert!(set.matches_id(&TestIdentifier::new("pkg.Foo", "testA")));
    }
}
