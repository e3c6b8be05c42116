//! Result listeners and the output ledger.
//!
//! Two protocols observe every run side by side:
//!
//! - [`LedgerListener`] streams "started" lines and failure blocks as they happen;
//! - [`CaseRecorder`] times each case and produces the tabular row and the [`ExecutionOutcome`].
//!
//! [`ListenerChain`] fans one event stream out to both.

mod ledger;
mod listener;
mod outcome;
mod recorder;

pub use ledger::{LedgerError, LedgerHandle, RunLedger};
pub use listener::LedgerListener;
pub use outcome::{ExecutionOutcome, Status};
pub use recorder::{CaseRecorder, CaseState};

use crate::framework::{Failure, RunListener, RunSummary};
use crate::id::TestIdentifier;

/// Forwards every event to each listener, in insertion order.
#[derive(Default)]
pub struct ListenerChain<'a> {
    listeners: Vec<&'a mut dyn RunListener>,
}

impl<'a> ListenerChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: &'a mut dyn RunListener) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl RunListener for ListenerChain<'_> {
    fn run_started(&mut self, container: &str) {
        self.listeners.iter_mut().for_each(|l| l.run_started(container));
    }

    fn test_started(&mut self, id: &TestIdentifier) {
        self.listeners.iter_mut().for_each(|l| l.test_started(id));
    }

    fn test_finished(&mut self, id: &TestIdentifier) {
        self.listeners.iter_mut().for_each(|l| l.test_finished(id));
    }

    fn test_failure(&mut self, failure: &Failure) {
        self.listeners.iter_mut().for_each(|l| l.test_failure(failure));
    }

    fn test_assumption_failure(&mut self, failure: &Failure) {
        self.listeners.iter_mut().for_each(|l| l.test_assumption_failure(failure));
    }

    fn test_ignored(&mut self, id: &TestIdentifier) {
        self.listeners.iter_mut().for_each(|l| l.test_ignored(id));
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        self.listeners.iter_mut().for_each(|l| l.run_finished(summary));
    }
}
