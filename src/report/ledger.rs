//! The process-wide output streams.
//!
//! Each stream is opened once and every record is flushed as soon as it is written, so the files stay
//! meaningful even when the process is killed between two cases. There is no close: dropping the
//! ledger (or exiting) finalizes the files.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use isorun_core::conventions::{FAILURE_PREFIX, LOADED_UNITS_DELIMITER, LOADED_UNITS_MARKER};
use miette::Diagnostic;
use thiserror::Error;

use super::ExecutionOutcome;
use crate::config::RunnerConfig;
use crate::id::TestIdentifier;

#[derive(Debug, Error, Diagnostic)]
pub enum LedgerError {
    #[error("cannot open {stream} stream at {}", path.display())]
    #[diagnostic(code(isorun::ledger::open), help("check that the parent directory exists and is writable"))]
    Open {
        stream: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

struct Stream {
    name: &'static str,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Stream {
    fn new(name: &'static str, writer: Box<dyn Write + Send>) -> Self {
        Self {
            name,
            writer: Mutex::new(writer),
        }
    }

    fn open(name: &'static str, path: &Path, append: bool) -> Result<Self, LedgerError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(|source| LedgerError::Open {
                stream: name,
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(name, Box::new(file)))
    }

    /// Write `lines` as one record and flush. Failures are logged, never raised: a broken output
    /// stream must not stop the run.
    fn append(&self, lines: &[&str]) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(writer, "{line}"))
            .and_then(|()| writer.flush());
        if let Err(e) = result {
            tracing::warn!(stream = self.name, error = %e, "failed to write record");
        }
    }
}

/// Append-only sinks for the all-tests, failing-tests, tabular and loaded-units streams. Absent streams
/// are silently skipped.
#[derive(Default)]
pub struct RunLedger {
    all_tests: Option<Stream>,
    failing_tests: Option<Stream>,
    timing: Option<Stream>,
    loaded_units: Option<Stream>,
}

impl std::fmt::Debug for RunLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = [&self.all_tests, &self.failing_tests, &self.timing, &self.loaded_units]
            .into_iter()
            .flatten()
            .map(|s| s.name)
            .collect();
        f.debug_struct("RunLedger").field("streams", &names).finish()
    }
}

impl RunLedger {
    /// A ledger writing nowhere.
    pub fn discard() -> Self {
        Self::default()
    }

    /// Open the file streams named by `config`.
    pub fn open(config: &RunnerConfig) -> Result<Self, LedgerError> {
        let open = |name, path: &Option<PathBuf>| {
            path.as_deref()
                .map(|p| Stream::open(name, p, config.append))
                .transpose()
        };
        Ok(Self {
            all_tests: open("all-tests", &config.all_tests)?,
            failing_tests: open("failing-tests", &config.failing_tests)?,
            timing: open("timing", &config.timing)?,
            loaded_units: open("loaded-units", &config.loaded_units)?,
        })
    }

    pub fn with_all_tests(mut self, writer: impl Write + Send + 'static) -> Self {
        self.all_tests = Some(Stream::new("all-tests", Box::new(writer)));
        self
    }

    pub fn with_failing_tests(mut self, writer: impl Write + Send + 'static) -> Self {
        self.failing_tests = Some(Stream::new("failing-tests", Box::new(writer)));
        self
    }

    pub fn with_timing(mut self, writer: impl Write + Send + 'static) -> Self {
        self.timing = Some(Stream::new("timing", Box::new(writer)));
        self
    }

    pub fn with_loaded_units(mut self, writer: impl Write + Send + 'static) -> Self {
        self.loaded_units = Some(Stream::new("loaded-units", Box::new(writer)));
        self
    }

    pub fn records_loaded_units(&self) -> bool {
        self.loaded_units.is_some()
    }

    /// all-tests: `container::case`.
    pub fn record_started(&self, id: &TestIdentifier) {
        if let Some(stream) = &self.all_tests {
            stream.append(&[&id.to_string()]);
        }
    }

    /// failing-tests: `--- heading` followed by the trace line.
    pub fn record_failure(&self, heading: &str, trace: &str) {
        if let Some(stream) = &self.failing_tests {
            stream.append(&[&format!("{FAILURE_PREFIX}{heading}"), trace]);
        }
    }

    /// failing-tests entry for a case whose worker had to be abandoned.
    pub fn record_aborted(&self, id: &TestIdentifier, reason: &str) {
        self.record_failure(&id.to_string(), &format!("aborted: {reason}"));
    }

    /// tabular: `id,durationNanos,pass|fail,trace`.
    pub fn record_outcome(&self, outcome: &ExecutionOutcome) {
        if let Some(stream) = &self.timing {
            stream.append(&[&outcome.to_row()]);
        }
    }

    /// loaded-units: `container::case#unit1,unit2,`. Every unit, the last included, is followed by the
    /// delimiter. Nothing is written for an empty set.
    pub fn record_loaded_units(&self, id: &TestIdentifier, units: &[String]) {
        let Some(stream) = &self.loaded_units else {
            return;
        };
        if units.is_empty() {
            return;
        }
        let mut line = format!("{id}{LOADED_UNITS_MARKER}");
        for unit in units {
            line.push_str(unit);
            line.push(LOADED_UNITS_DELIMITER);
        }
        stream.append(&[&line]);
    }
}

/// One task's view of the shared [`RunLedger`].
///
/// The supervisor revokes the handle of a worker it abandons; from then on every write through it is
/// dropped, so a late-finishing worker cannot add rows after its case was reported as aborted.
/// [`revoke`](Self::revoke) waits for a write already in progress.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    ledger: Arc<RunLedger>,
    revoked: Arc<RwLock<bool>>,
}

impl LedgerHandle {
    pub fn new(ledger: Arc<RunLedger>) -> Self {
        Self {
            ledger,
            revoked: Arc::new(RwLock::new(false)),
        }
    }

    pub fn revoke(&self) {
        *self.revoked.write().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn is_revoked(&self) -> bool {
        *self.revoked.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `write` against the ledger, or return `None` once revoked.
    pub fn with<R>(&self, write: impl FnOnce(&RunLedger) -> R) -> Option<R> {
        let revoked = self.revoked.read().unwrap_or_else(PoisonError::into_inner);
        if *revoked {
            return None;
        }
        Some(write(&self.ledger))
    }
}

impl From<Arc<RunLedger>> for LedgerHandle {
    fn from(ledger: Arc<RunLedger>) -> Self {
        Self::new(ledger)
    }
}
