use std::time::Instant;

use isorun_core::normalize_trace;

use super::{ExecutionOutcome, LedgerHandle};
use crate::framework::{Failure, RunListener};
use crate::id::TestIdentifier;

/// Where the per-case state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Idle,
    Starting,
    Running,
    Passed,
    Failed,
    Reported,
}

/// Tabular protocol: times each case, keeps its last failure trace and emits one row when it ends.
///
/// `Idle -> Starting -> Running -> {Passed, Failed} -> Reported -> Idle`. Once a case has failed it
/// stays failed; a later failure only replaces the trace.
#[derive(Debug)]
pub struct CaseRecorder {
    ledger: Option<LedgerHandle>,
    state: CaseState,
    current: Option<TestIdentifier>,
    started_at: Option<Instant>,
    failed: bool,
    trace: String,
    stray_trace: Option<String>,
    ignored: Vec<TestIdentifier>,
    outcomes: Vec<ExecutionOutcome>,
}

impl CaseRecorder {
    /// Record outcomes; when `ledger` is given, every row is also appended to its tabular stream.
    pub fn new(ledger: Option<LedgerHandle>) -> Self {
        Self {
            ledger,
            state: CaseState::Idle,
            current: None,
            started_at: None,
            failed: false,
            trace: String::new(),
            stray_trace: None,
            ignored: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    pub fn outcomes(&self) -> &[ExecutionOutcome] {
        &self.outcomes
    }

    /// The outcome for `requested`.
    ///
    /// When the framework never reported that exact case, the answer is derived: the last failing
    /// outcome of the run (e.g. an `initializationError` stand-in), a failure seen outside any case,
    /// a pass for an ignored case, or a failure saying nothing ran.
    ///
    /// A derived failure gets a row of its own under the requested id, so the tabular stream always has
    /// a row for every requested case that was not abandoned. When a stand-in case already reported,
    /// its row stays as well: an unknown `pkg.Foo::testGone` yields `pkg.Foo::initializationError` and
    /// then `pkg.Foo::testGone`, both failing with the same trace.
    pub fn finish(mut self, requested: &TestIdentifier) -> ExecutionOutcome {
        if let Some(outcome) = self.outcomes.iter().find(|o| o.id() == requested) {
            return outcome.clone();
        }
        if self.ignored.contains(requested) {
            return ExecutionOutcome::passed(requested.clone(), 0);
        }

        let derived = if let Some(last) = self.outcomes.iter().rev().find(|o| !o.is_pass()) {
            ExecutionOutcome::failed(requested.clone(), last.duration_nanos(), last.trace())
        } else if let Some(trace) = self.stray_trace.take() {
            ExecutionOutcome::failed(requested.clone(), 0, trace)
        } else if let Some(last) = self.outcomes.last() {
            ExecutionOutcome::failed(
                requested.clone(),
                last.duration_nanos(),
                format!("no test named {requested} was run; ran {} instead", last.id()),
            )
        } else {
            ExecutionOutcome::failed(requested.clone(), 0, format!("no test named {requested} was run"))
        };
        self.emit(&derived);
        derived
    }

    fn emit(&self, outcome: &ExecutionOutcome) {
        if let Some(ledger) = &self.ledger {
            ledger.with(|l| l.record_outcome(outcome));
        }
    }
}

impl RunListener for CaseRecorder {
    fn test_started(&mut self, id: &TestIdentifier) {
        self.state = CaseState::Starting;
        self.current = Some(id.clone());
        self.started_at = Some(Instant::now());
        self.failed = false;
        self.trace.clear();
        self.state = CaseState::Running;
    }

    fn test_failure(&mut self, failure: &Failure) {
        let trace = normalize_trace(&failure.trace());
        if self.state == CaseState::Running {
            self.failed = true;
            self.trace = trace;
        } else {
            self.stray_trace = Some(trace);
        }
    }

    fn test_ignored(&mut self, id: &TestIdentifier) {
        self.ignored.push(id.clone());
    }

    fn test_finished(&mut self, id: &TestIdentifier) {
        if self.state != CaseState::Running {
            tracing::warn!(test = %id, "finish reported for a case that was never started");
            return;
        }
        let nanos = self
            .started_at
            .take()
            .map(|t| u64::try_from(t.elapsed().as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        let id = self.current.take().unwrap_or_else(|| id.clone());

        let outcome = if self.failed {
            self.state = CaseState::Failed;
            ExecutionOutcome::failed(id, nanos, std::mem::take(&mut self.trace))
        } else {
            self.state = CaseState::Passed;
            ExecutionOutcome::passed(id, nanos)
        };

        self.emit(&outcome);
        self.state = CaseState::Reported;
        self.outcomes.push(outcome);
        self.state = CaseState::Idle;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::framework::Fault;
    use crate::report::Status;

    fn id(case: &str) -> TestIdentifier {
        TestIdentifier::new("pkg.Foo", case)
    }

    #[test]
    fn test_pass_then_fail() {
        let mut recorder = CaseRecorder::new(None);
        recorder.test_started(&id("testA"));
        assert_eq!(recorder.state(), CaseState::Running);
        recorder.test_finished(&id("testA"));
        assert_eq!(recorder.state(), CaseState::Idle);

        recorder.test_started(&id("testB"));
        recorder.test_failure(&Failure::of_case(&id("testB"), Fault::new("boom\n\tat x")));
        recorder.test_finished(&id("testB"));

        let outcomes = recorder.outcomes();
        assert_eq!(outcomes[0].status(), Status::Pass);
        assert_eq!(outcomes[0].trace(), "");
        assert_eq!(outcomes[1].status(), Status::Fail);
        assert_eq!(outcomes[1].trace(), "boom at x");
    }

    #[test]
    fn test_fail_wins_and_last_trace_kept() {
        let mut recorder = CaseRecorder::new(None);
        recorder.test_started(&id("testA"));
        recorder.test_failure(&Failure::of_case(&id("testA"), Fault::new("first")));
        recorder.test_failure(&Failure::of_case(&id("testA"), Fault::new("second")));
        recorder.test_finished(&id("testA"));

        let outcome = recorder.finish(&id("testA"));
        assert_eq!(outcome.status(), Status::Fail);
        assert_eq!(outcome.trace(), "second");
    }

    #[test]
    fn test_new_case_clears_previous_trace() {
        let mut recorder = CaseRecorder::new(None);
        recorder.test_started(&id("testA"));
        recorder.test_failure(&Failure::of_case(&id("testA"), Fault::new("bad")));
        recorder.test_finished(&id("testA"));
        recorder.test_started(&id("testB"));
        recorder.test_finished(&id("testB"));
        assert!(recorder.outcomes()[1].is_pass());
    }

    #[test]
    fn test_stand_in_case_decides_requested_outcome() {
        let mut recorder = CaseRecorder::new(None);
        let stand_in = id("initializationError");
        recorder.test_started(&stand_in);
        recorder.test_failure(&Failure::of_case(&stand_in, Fault::new("No tests found")));
        recorder.test_finished(&stand_in);

        let outcome = recorder.finish(&id("testGone"));
        assert_eq!(outcome.id(), &id("testGone"));
        assert_eq!(outcome.trace(), "No tests found");
    }

    #[test]
    fn test_container_failure_outside_a_case() {
        let mut recorder = CaseRecorder::new(None);
        recorder.test_failure(&Failure::new("pkg.Foo", None, Fault::new("static init failed")));
        let outcome = recorder.finish(&id("testA"));
        assert_eq!(outcome.status(), Status::Fail);
        assert_eq!(outcome.trace(), "static init failed");
    }

    #[test]
    fn test_ignored_case_passes() {
        let mut recorder = CaseRecorder::new(None);
        recorder.test_ignored(&id("testSkip"));
        assert!(recorder.finish(&id("testSkip")).is_pass());
    }

    #[test]
    fn test_nothing_ran() {
        let outcome = CaseRecorder::new(None).finish(&id("testA"));
        assert_eq!(outcome.status(), Status::Fail);
        assert!(outcome.trace().contains("pkg.Foo::testA"));
    }
}
