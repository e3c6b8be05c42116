//! Decide which containers are test containers and enumerate their cases.
//!
//! Two conventions coexist and are checked independently:
//!
//! - **legacy**: the container derives, directly or transitively, from the legacy base type and cases
//!   are recognised by name;
//! - **marker**: at least one method carries the test or theory marker annotation.
//!
//! A container qualifies when either convention applies. The case list itself comes from the test
//! framework's run description, so it follows the framework's reporting order.

use std::collections::HashSet;

use isorun_core::conventions::{
    has_test_affix, is_anonymous_name, LEGACY_BASE_TYPE, LEGACY_SUITE_FAILURE_TYPE, LEGACY_WARNING_METHOD,
    TEST_MARKER, THEORY_MARKER,
};

use super::introspect::{ContainerInfo, Introspector, MethodInfo, Returns};
use super::{CaseFilter, ClassifyError};
use crate::framework::{Description, TestFramework};
use crate::id::TestIdentifier;
use crate::patterns::PatternSet;

/// Check whether `info` looks like a test container.
///
/// ## Parameters
/// - `info`: the container to check.
/// - `introspector`: used to walk the supertype chain.
///
/// ## Notes
/// - A supertype that cannot be inspected ends the walk; the container then counts as not derived.
pub fn looks_like_test_container<I: Introspector + ?Sized>(info: &ContainerInfo, introspector: &I) -> bool {
    let modifiers = info.modifiers();
    if !modifiers.is_public() || modifiers.is_abstract() || modifiers.is_interface() {
        return false;
    }
    if is_anonymous_name(info.name()) {
        return false;
    }
    derives_from_legacy_base(info, introspector) || has_marked_method(info)
}

/// Check whether `method` looks like a test method: marker-annotated, or a public, parameterless method
/// returning nothing whose name starts or ends with `test`/`Test`.
pub fn looks_like_test_method(method: &MethodInfo) -> bool {
    if method.has_annotation(TEST_MARKER) {
        return true;
    }
    method.parameter_count() == 0
        && method.returns() == Returns::Unit
        && method.modifiers().is_public()
        && has_test_affix(method.name())
}

/// Walk the supertype chain of `info` looking for the legacy base type.
pub fn derives_from_legacy_base<I: Introspector + ?Sized>(info: &ContainerInfo, introspector: &I) -> bool {
    let mut visited = HashSet::new();
    let mut next = info.superclass().map(str::to_string);

    while let Some(name) = next {
        if name == LEGACY_BASE_TYPE {
            return true;
        }
        if !visited.insert(name.clone()) {
            tracing::warn!(container = info.name(), supertype = %name, "cyclic supertype chain");
            return false;
        }
        next = match introspector.inspect(&name) {
            Ok(parent) => parent.superclass().map(str::to_string),
            Err(_) => return false,
        };
    }
    false
}

fn has_marked_method(info: &ContainerInfo) -> bool {
    info.methods()
        .iter()
        .any(|m| m.has_annotation(TEST_MARKER) || m.has_annotation(THEORY_MARKER))
}

/// Classifies containers using an [`Introspector`] and a [`TestFramework`].
pub struct Classifier<'a, I: ?Sized, F: ?Sized> {
    introspector: &'a I,
    framework: &'a F,
}

impl<'a, I, F> Classifier<'a, I, F>
where
    I: Introspector + ?Sized,
    F: TestFramework + ?Sized,
{
    pub fn new(introspector: &'a I, framework: &'a F) -> Self {
        Self {
            introspector,
            framework,
        }
    }

    /// Every case of `container`, unfiltered. Empty when the container is not a test container.
    ///
    /// ## Errors
    /// - The container cannot be inspected, or the framework cannot describe it.
    #[tracing::instrument(skip_all, fields(container = container))]
    pub fn candidates(&self, container: &str) -> Result<Vec<TestIdentifier>, ClassifyError> {
        let info = self.introspector.inspect(container)?;
        if !looks_like_test_container(&info, self.introspector) {
            tracing::debug!("not a test container");
            return Ok(Vec::new());
        }

        let description = self.framework.describe(container)?;
        let mut ids = Vec::new();
        for child in description.children() {
            self.enumerate(&info, child, &mut ids);
        }
        Ok(ids)
    }

    /// Classify `container` and keep the cases `filter` accepts.
    pub fn classify(&self, container: &str, filter: &CaseFilter) -> Result<Vec<TestIdentifier>, ClassifyError> {
        let mut ids = self.candidates(container)?;
        ids.retain(|id| filter.accepts(id));
        Ok(ids)
    }

    /// Filter once per pattern and concatenate the results; an identifier matched by several patterns
    /// appears once per match.
    pub fn classify_each_pattern(
        &self,
        container: &str,
        patterns: &PatternSet,
        exclude: &PatternSet,
    ) -> Result<Vec<TestIdentifier>, ClassifyError> {
        let candidates = self.candidates(container)?;
        let mut ids = Vec::new();
        for pattern in patterns.iter() {
            ids.extend(
                candidates
                    .iter()
                    .filter(|id| pattern.matches_id(id) && !exclude.matches_id(id))
                    .cloned(),
            );
        }
        Ok(ids)
    }

    fn enumerate(&self, info: &ContainerInfo, child: &Description, ids: &mut Vec<TestIdentifier>) {
        match (child.container(), child.method()) {
            (_, None) => {
                // a parameterized instance: one case per test-like method
                for method in self.public_methods(info) {
                    if looks_like_test_method(&method) {
                        let case = format!("{}{}", method.name(), child.display_name());
                        ids.push(TestIdentifier::new(info.name(), case));
                    }
                }
            }
            (Some(LEGACY_SUITE_FAILURE_TYPE), Some(LEGACY_WARNING_METHOD)) => {}
            (container, Some(method)) => {
                ids.push(TestIdentifier::new(container.unwrap_or(info.name()), method));
            }
        }
    }

    /// Public methods of `info` followed by inherited public methods it does not override.
    fn public_methods(&self, info: &ContainerInfo) -> Vec<MethodInfo> {
        let mut names = HashSet::new();
        let mut visited = HashSet::new();
        let mut methods = Vec::new();
        let mut current = Some(info.clone());

        while let Some(container) = current.take() {
            if !visited.insert(container.name().to_string()) {
                break;
            }
            for method in container.methods() {
                if method.modifiers().is_public() && names.insert(method.name().to_string()) {
                    methods.push(method.clone());
                }
            }
            current = container
                .superclass()
                .and_then(|name| self.introspector.inspect(name).ok());
        }
        methods
    }
}
