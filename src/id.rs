//! Test identifiers (`container::case`).

use std::fmt;
use std::str::FromStr;

use isorun_core::conventions::CASE_SEPARATOR;
use thiserror::Error;

/// Errors produced when parsing an identifier line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("malformed test identifier '{0}': expected <container>::<case>")]
    Malformed(String),
}

/// Uniquely identifies one runnable test case within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestIdentifier {
    container: String,
    case: String,
}

impl TestIdentifier {
    pub fn new(container: impl Into<String>, case: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            case: case.into(),
        }
    }

    /// Parse a `container::case` line.
    ///
    /// Both halves must be non-empty and must not contain `:`; surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Result<Self, IdentifierError> {
        let line = line.trim();
        let malformed = || IdentifierError::Malformed(line.to_string());

        let (container, case) = line.split_once(CASE_SEPARATOR).ok_or_else(malformed)?;
        if container.is_empty() || case.is_empty() || container.contains(':') || case.contains(':') {
            return Err(malformed());
        }
        Ok(Self::new(container, case))
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn case(&self) -> &str {
        &self.case
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.container, CASE_SEPARATOR, self.case)
    }
}

impl FromStr for TestIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
