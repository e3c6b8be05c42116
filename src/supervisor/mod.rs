//! Runs each test case on a dedicated, interruptible worker.
//!
//! The supervisor blocks on the worker's result, bounded by a timeout. Whatever goes wrong (the task
//! errors, the worker panics, or the timeout expires) the worker's group is interrupted and destroyed
//! and the caller gets no outcome, so the run loop always moves on to the next case. An abandoned worker
//! loses its access to the output streams before it is interrupted.

mod group;
mod task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use group::{check_interrupted, is_interrupted, sleep, GroupError, Interrupted, WorkerGroup};
pub use task::{TaskError, TestTask};

use crate::framework::{panic_message, TestFramework};
use crate::id::TestIdentifier;
use crate::isolation::IsolationBoundary;
use crate::report::{ExecutionOutcome, LedgerHandle, RunLedger};
use crate::settings::Settings;
use task::TaskContext;

/// Why a case produced no outcome.
#[derive(Debug, Error)]
pub enum Abort {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("worker exited without a result")]
    Disconnected,

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Group(#[from] GroupError),
}

pub struct Supervisor<F: ?Sized> {
    context: Arc<TaskContext<F>>,
    timeout: Option<Duration>,
}

impl<F> Supervisor<F>
where
    F: TestFramework + ?Sized + 'static,
{
    pub fn new(framework: Arc<F>, boundary: IsolationBoundary, ledger: Arc<RunLedger>) -> Self {
        Self {
            context: Arc::new(TaskContext {
                boundary,
                ledger,
                framework,
            }),
            timeout: None,
        }
    }

    /// Bound the wait for each case; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ledger(&self) -> &Arc<RunLedger> {
        &self.context.ledger
    }

    pub fn settings(&self) -> &Settings {
        self.context.boundary.settings()
    }

    /// Run `id`, or `None` if the worker had to be abandoned.
    pub fn run(&self, id: &TestIdentifier) -> Option<ExecutionOutcome> {
        self.supervise(id).ok()
    }

    /// Run `id` and say why when no outcome could be collected.
    #[tracing::instrument(skip_all, fields(test = %id))]
    pub fn supervise(&self, id: &TestIdentifier) -> Result<ExecutionOutcome, Abort> {
        let task = TestTask::new(id.clone());
        let group = WorkerGroup::new(format!("[thread group for {task}]"));
        let (tx, rx) = mpsc::channel();

        let handle = LedgerHandle::new(Arc::clone(&self.context.ledger));
        let context = Arc::clone(&self.context);
        let worker_task = task.clone();
        let worker_handle = handle.clone();
        let spawned = group.spawn(format!("[thread for {task}]"), move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| worker_task.call(&context, &worker_handle)));
            // the receiver is gone once the supervisor gave up on us
            let _ = tx.send(result);
        });

        let result = match spawned {
            Ok(_detached) => self.wait(&rx),
            Err(e) => Err(Abort::Group(e)),
        };

        if let Err(abort) = &result {
            handle.revoke();
            let interrupted = group.interrupt_all();
            tracing::warn!(task = %task, reason = %abort, interrupted, "abandoning worker");
        }
        group.destroy();
        result
    }

    fn wait(
        &self,
        rx: &mpsc::Receiver<std::thread::Result<Result<ExecutionOutcome, TaskError>>>,
    ) -> Result<ExecutionOutcome, Abort> {
        let received = match self.timeout {
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => Abort::TimedOut(timeout),
                RecvTimeoutError::Disconnected => Abort::Disconnected,
            })?,
            None => rx.recv().map_err(|_| Abort::Disconnected)?,
        };
        match received {
            Ok(outcome) => Ok(outcome?),
            Err(payload) => Err(Abort::Panicked(panic_message(&*payload))),
        }
    }
}
