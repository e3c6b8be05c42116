use isorun_core::conventions::{
    BROKEN_TEST_INPUT, CASE_SEPARATOR, CREATE_TEST_FRAME, INITIALIZATION_ERROR_METHOD, LEGACY_WARNING_METHOD,
};
use isorun_core::normalize_trace;

use super::LedgerHandle;
use crate::framework::{Failure, RunListener, RunSummary};
use crate::id::TestIdentifier;

/// Streaming protocol: writes started cases and failure blocks to the ledger as they happen.
///
/// Failures that mean "the container itself is broken" are attributed to the container and written
/// once per run; see [`LedgerListener::is_container_failure`].
pub struct LedgerListener {
    ledger: LedgerHandle,
    container: Option<String>,
    container_reported: bool,
    container_problems: bool,
}

impl LedgerListener {
    pub fn new(ledger: impl Into<LedgerHandle>) -> Self {
        Self {
            ledger: ledger.into(),
            container: None,
            container_reported: false,
            container_problems: false,
        }
    }

    /// True once any failure of this run was attributed to the container, or its input was broken.
    pub fn has_container_problems(&self) -> bool {
        self.container_problems
    }

    /// A failure belongs to the container when it names no method, names the framework's container
    /// error methods, or was raised while constructing the test instance.
    pub fn is_container_failure(failure: &Failure) -> bool {
        match failure.method() {
            None => true,
            Some(LEGACY_WARNING_METHOD | INITIALIZATION_ERROR_METHOD) => true,
            Some(_) => failure.fault().has_frame(CREATE_TEST_FRAME),
        }
    }

    /// The `(heading, trace)` block for `failure`, or `None` if it is suppressed.
    fn failure_block(&mut self, failure: &Failure) -> Option<(String, String)> {
        let trace = normalize_trace(&failure.trace());

        if let Some(method) = failure.method() {
            if failure.container().is_empty() || method.is_empty() {
                self.container_problems = true;
                let heading = format!("{BROKEN_TEST_INPUT} {}{CASE_SEPARATOR}{method}", failure.container());
                return Some((heading, trace));
            }
        }

        if Self::is_container_failure(failure) {
            self.container_problems = true;
            if self.container_reported {
                return None;
            }
            self.container_reported = true;
            let heading = self.container.clone().unwrap_or_else(|| failure.container().to_string());
            return Some((heading, trace));
        }

        let method = failure.method().unwrap_or_default();
        Some((format!("{}{CASE_SEPARATOR}{method}", failure.container()), trace))
    }
}

impl RunListener for LedgerListener {
    fn run_started(&mut self, container: &str) {
        self.container = Some(container.to_string());
        self.container_reported = false;
    }

    fn test_started(&mut self, id: &TestIdentifier) {
        self.ledger.with(|l| l.record_started(id));
    }

    fn test_failure(&mut self, failure: &Failure) {
        if let Some((heading, trace)) = self.failure_block(failure) {
            self.ledger.with(|l| l.record_failure(&heading, &trace));
        }
    }

    fn test_ignored(&mut self, id: &TestIdentifier) {
        tracing::debug!(test = %id, "ignored");
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        tracing::debug!(run = summary.run, failed = summary.failed, "run finished");
    }
}
