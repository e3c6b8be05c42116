//! The two top-level workflows: discover test identifiers, and run a list of them one by one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::discovery::{CaseFilter, ClassifyError, Classifier};
use crate::framework::TestFramework;
use crate::harness::Backend;
use crate::id::{IdentifierError, TestIdentifier};
use crate::patterns::PatternSet;
use crate::report::{ExecutionOutcome, Status};
use crate::supervisor::Supervisor;

#[derive(Debug, Error, Diagnostic)]
pub enum DriverError {
    #[error("cannot read test list {}", path.display())]
    #[diagnostic(code(isorun::driver::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line} of {}", path.display())]
    #[diagnostic(code(isorun::driver::identifier), help("every line must look like `pkg.Container::case`"))]
    Identifier {
        path: PathBuf,
        line: usize,
        #[source]
        source: IdentifierError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Classify(#[from] ClassifyError),

    #[error("cannot write discovered tests")]
    #[diagnostic(code(isorun::driver::write))]
    Write(#[source] io::Error),
}

/// How discovered cases are filtered.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Keep a case iff it matches the include set and not the exclude set.
    Filter(CaseFilter),
    /// Filter once per include pattern and concatenate; duplicates are kept.
    PerPattern { patterns: PatternSet, exclude: PatternSet },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Filter(CaseFilter::all())
    }
}

/// Classify every container below `root` and write one identifier per line to `out`.
///
/// ## Errors
/// - Any container that cannot be enumerated, inspected or described aborts discovery.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn find_tests<B, W>(
    backend: &B,
    root: &Path,
    selection: &Selection,
    out: &mut W,
) -> Result<Vec<TestIdentifier>, DriverError>
where
    B: Backend + ?Sized,
    W: Write + ?Sized,
{
    let classifier = Classifier::new(backend, backend);
    let mut found = Vec::new();

    for container in backend.containers(root)? {
        let ids = match selection {
            Selection::Filter(filter) => classifier.classify(&container, filter)?,
            Selection::PerPattern { patterns, exclude } => {
                classifier.classify_each_pattern(&container, patterns, exclude)?
            }
        };
        for id in &ids {
            writeln!(out, "{id}").map_err(DriverError::Write)?;
        }
        found.extend(ids);
    }
    out.flush().map_err(DriverError::Write)?;

    tracing::info!(count = found.len(), "discovered test cases");
    Ok(found)
}

/// Parse a test list: one identifier per non-blank line.
pub fn read_identifiers(path: &Path) -> Result<Vec<TestIdentifier>, DriverError> {
    let text = fs::read_to_string(path).map_err(|source| DriverError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            TestIdentifier::parse(line).map_err(|source| DriverError::Identifier {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Tally of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub passed: Vec<TestIdentifier>,
    pub failed: Vec<TestIdentifier>,
    pub aborted: Vec<TestIdentifier>,
}

impl RunReport {
    pub fn attempted(&self) -> usize {
        self.passed.len() + self.failed.len() + self.aborted.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_empty()
    }

    fn record(&mut self, outcome: &ExecutionOutcome) {
        match outcome.status() {
            Status::Pass => self.passed.push(outcome.id().clone()),
            Status::Fail => self.failed.push(outcome.id().clone()),
        }
    }
}

/// Run every identifier in order, strictly one at a time.
///
/// Ambient settings are snapshotted before the first case and restored after every case. A case whose
/// worker had to be abandoned is written to the failing-tests stream as aborted.
pub fn run_all<F, I>(supervisor: &Supervisor<F>, ids: I) -> RunReport
where
    F: TestFramework + ?Sized + 'static,
    I: IntoIterator<Item = TestIdentifier>,
{
    let settings = supervisor.settings();
    let backup = settings.snapshot();
    let mut report = RunReport::default();

    for id in ids {
        tracing::info!("Running: {id}");
        match supervisor.supervise(&id) {
            Ok(outcome) => report.record(&outcome),
            Err(abort) => {
                supervisor.ledger().record_aborted(&id, &abort.to_string());
                report.aborted.push(id);
            }
        }
        settings.restore(&backup);
    }

    tracing::info!(
        attempted = report.attempted(),
        passed = report.passed.len(),
        failed = report.failed.len(),
        aborted = report.aborted.len(),
        "run complete"
    );
    report
}
