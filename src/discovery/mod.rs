//! Test discovery: turn a directory of compiled containers into an ordered list of test identifiers.

mod artifacts;
mod classifier;
mod introspect;

use miette::Diagnostic;
use thiserror::Error;

pub use artifacts::ArtifactDirectory;
pub use classifier::{derives_from_legacy_base, looks_like_test_container, looks_like_test_method, Classifier};
pub use introspect::{ContainerInfo, IntrospectError, Introspector, MethodInfo, Modifiers, Returns};

use crate::framework::FrameworkError;
use crate::id::TestIdentifier;
use crate::patterns::PatternSet;

/// Errors that abort discovery.
#[derive(Debug, Error, Diagnostic)]
pub enum ClassifyError {
    #[error("cannot introspect container")]
    #[diagnostic(code(isorun::discovery::introspect))]
    Introspect(#[from] IntrospectError),

    #[error("cannot describe container")]
    #[diagnostic(code(isorun::discovery::describe))]
    Framework(#[from] FrameworkError),

    #[error("cannot enumerate artifacts")]
    #[diagnostic(code(isorun::discovery::artifacts), help("check that the root is a readable directory"))]
    Artifacts(#[from] std::io::Error),
}

/// Include/exclude selection: an identifier is kept iff it matches `include` and does not match
/// `exclude`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFilter {
    include: PatternSet,
    exclude: PatternSet,
}

impl Default for CaseFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl CaseFilter {
    pub fn new(include: PatternSet, exclude: PatternSet) -> Self {
        Self { include, exclude }
    }

    /// Keep everything.
    pub fn all() -> Self {
        Self::including(PatternSet::match_all())
    }

    /// A single unified pattern set, excluding nothing.
    pub fn including(include: PatternSet) -> Self {
        Self::new(include, PatternSet::empty())
    }

    pub fn excluding(mut self, exclude: PatternSet) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn include(&self) -> &PatternSet {
        &self.include
    }

    pub fn exclude(&self) -> &PatternSet {
        &self.exclude
    }

    pub fn accepts(&self, id: &TestIdentifier) -> bool {
        self.include.matches_id(id) && !self.exclude.matches_id(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_accepts_everything() {
        assert!(CaseFilter::default().accepts(&TestIdentifier::new("pkg.Foo", "testA")));
    }

    #[test]
    fn test_exclude_beats_include() {
        let filter = CaseFilter::including(PatternSet::parse_list("pkg.*").unwrap())
            .excluding(PatternSet::parse_list("pkg.Slow::*").unwrap());
        assert!(filter.accepts(&TestIdentifier::new("pkg.Foo", "testA")));
        assert!(!filter.accepts(&TestIdentifier::new("pkg.Slow", "testA")));
        assert!(!filter.accepts(&TestIdentifier::new("other.Foo", "testA")));
    }

    #[test]
    fn test_empty_include_keeps_nothing() {
        let filter = CaseFilter::including(PatternSet::empty());
        assert!(!filter.accepts(&TestIdentifier::new("pkg.Foo", "testA")));
    }
}
