//! Isolated execution environments.
//!
//! Every test run gets a fresh [`ExecutionScope`]: application units are defined anew inside it, so any
//! state they hold dies with the scope. A small allow-list of name prefixes ([`SharedPrefixes`]) always
//! resolves through the process-wide [`AmbientContext`] instead, which keeps a single copy of framework,
//! assertion and coverage bookkeeping for the whole process.
//!
//! ## Resolution order
//!
//! 1. Shared prefix -> ambient context.
//! 2. Already defined in this scope -> that definition.
//! 3. Defined by one of the scope's roots -> a fresh definition, cached in the scope.
//! 4. Otherwise -> ambient context.
//!
//! Every requested name is logged once, in first-encounter order, whichever path served it.

mod roots;
mod scope;

use std::io;
use std::sync::Arc;

use isorun_core::conventions::DEFAULT_SHARED_PREFIXES;
use thiserror::Error;

pub use roots::{Classpath, DirectoryRoot, FactoryRoot, LoadedArtifact, Unit, UnitRoot};
pub use scope::{AmbientContext, ExecutionScope};

use crate::settings::Settings;

/// Errors produced while resolving a unit.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("unit '{0}' not found on the classpath")]
    NotFound(String),

    #[error("execution scope {0} has been torn down")]
    TornDown(u64),

    #[error("unit '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("failed to read unit '{name}'")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Name prefixes that always resolve through the ambient context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedPrefixes(Vec<String>);

impl Default for SharedPrefixes {
    fn default() -> Self {
        Self(DEFAULT_SHARED_PREFIXES.iter().map(|p| p.to_string()).collect())
    }
}

impl SharedPrefixes {
    /// No shared prefixes at all.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, prefix: impl Into<String>) -> Self {
        self.0.push(prefix.into());
        self
    }

    pub fn is_shared(&self, name: &str) -> bool {
        self.0.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SharedPrefixes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Everything needed to build a fresh scope: the roots, the ambient context, the shared prefixes and the
/// ambient settings.
#[derive(Debug, Clone)]
pub struct IsolationBoundary {
    classpath: Classpath,
    ambient: Arc<AmbientContext>,
    shared: SharedPrefixes,
    settings: Settings,
}

impl IsolationBoundary {
    /// Build a boundary whose ambient context sees the same roots as the scopes.
    pub fn new(classpath: Classpath) -> Self {
        let ambient = Arc::new(AmbientContext::new(classpath.clone()));
        Self {
            classpath,
            ambient,
            shared: SharedPrefixes::default(),
            settings: Settings::new(),
        }
    }

    pub fn with_ambient(mut self, ambient: Arc<AmbientContext>) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_shared_prefixes(mut self, shared: SharedPrefixes) -> Self {
        self.shared = shared;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Create a fresh scope for execution number `id`.
    pub fn scope(&self, id: u64) -> Arc<ExecutionScope> {
        Arc::new(ExecutionScope::new(
            id,
            self.classpath.clone(),
            Arc::clone(&self.ambient),
            self.shared.clone(),
            self.settings.clone(),
        ))
    }

    pub fn ambient(&self) -> &Arc<AmbientContext> {
        &self.ambient
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn shared_prefixes(&self) -> &SharedPrefixes {
        &self.shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefixes_cover_framework_and_coverage() {
        let shared = SharedPrefixes::default();
        assert!(shared.is_shared("org.junit.Assert"));
        assert!(shared.is_shared("junit.framework.TestCase"));
        assert!(shared.is_shared("org.hamcrest.Matcher"));
        assert!(shared.is_shared("org.jacoco.agent.rt.RT"));
        assert!(!shared.is_shared("pkg.Foo"));
        // prefixes are literal, not word-based
        assert!(!shared.is_shared("junitx.Foo"));
    }

    #[test]
    fn test_extra_prefixes() {
        let shared = SharedPrefixes::none().with("com.acme.agent.");
        assert!(shared.is_shared("com.acme.agent.Hits"));
        assert!(!shared.is_shared("org.junit.Assert"));
    }
}
