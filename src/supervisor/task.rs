use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::framework::{FrameworkError, RunRequest, TestFramework};
use crate::id::TestIdentifier;
use crate::isolation::{IsolationBoundary, ScopeError};
use crate::report::{CaseRecorder, ExecutionOutcome, LedgerHandle, LedgerListener, ListenerChain, RunLedger};

static NEXT_TASK: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("cannot resolve container '{container}'")]
    Container {
        container: String,
        #[source]
        source: ScopeError,
    },

    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

/// What every task of a run shares.
pub(crate) struct TaskContext<F: ?Sized> {
    pub(crate) boundary: IsolationBoundary,
    pub(crate) ledger: Arc<RunLedger>,
    pub(crate) framework: Arc<F>,
}

/// A single-use unit of work: run one case in a fresh scope.
#[derive(Debug, Clone)]
pub struct TestTask {
    seq: u64,
    id: TestIdentifier,
}

impl TestTask {
    /// A task with the next process-wide sequence number.
    pub fn new(id: TestIdentifier) -> Self {
        Self {
            seq: NEXT_TASK.fetch_add(1, Ordering::Relaxed),
            id,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn id(&self) -> &TestIdentifier {
        &self.id
    }

    /// Every write to the run's streams goes through `ledger`, so nothing lands once it is revoked.
    pub(crate) fn call<F>(
        &self,
        ctx: &TaskContext<F>,
        ledger: &LedgerHandle,
    ) -> Result<ExecutionOutcome, TaskError>
    where
        F: TestFramework + ?Sized,
    {
        let scope = ctx.boundary.scope(self.seq);
        scope
            .resolve(self.id.container())
            .map_err(|source| TaskError::Container {
                container: self.id.container().to_string(),
                source,
            })?;

        let request = RunRequest::for_id(&self.id);
        let mut streaming = LedgerListener::new(ledger.clone());
        let mut recorder = CaseRecorder::new(Some(ledger.clone()));
        {
            let mut listeners = ListenerChain::new().with(&mut streaming).with(&mut recorder);
            ctx.framework.run(&request, &scope, &mut listeners)?;
        }

        let units = scope.teardown();
        if !streaming.has_container_problems() {
            ledger.with(|l| {
                if l.records_loaded_units() {
                    l.record_loaded_units(&self.id, &units);
                }
            });
        }
        Ok(recorder.finish(&self.id))
    }
}

impl fmt::Display for TestTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] # {}", self.seq, self.id)
    }
}
