use std::fmt;

use isorun_core::conventions::{STATUS_FAIL, STATUS_PASS, TABULAR_DELIMITER};

use crate::id::TestIdentifier;

const MISSING_TRACE: &str = "failure reported without a trace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => STATUS_PASS,
            Status::Fail => STATUS_FAIL,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing one test case. The trace is empty iff the case passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    id: TestIdentifier,
    duration_nanos: u64,
    status: Status,
    trace: String,
}

impl ExecutionOutcome {
    pub fn passed(id: TestIdentifier, duration_nanos: u64) -> Self {
        Self {
            id,
            duration_nanos,
            status: Status::Pass,
            trace: String::new(),
        }
    }

    /// A failing outcome; `trace` should already be normalized.
    pub fn failed(id: TestIdentifier, duration_nanos: u64, trace: impl Into<String>) -> Self {
        let mut trace = trace.into();
        if trace.is_empty() {
            trace = MISSING_TRACE.to_string();
        }
        Self {
            id,
            duration_nanos,
            status: Status::Fail,
            trace,
        }
    }

    pub fn id(&self) -> &TestIdentifier {
        &self.id
    }

    pub fn duration_nanos(&self) -> u64 {
        self.duration_nanos
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// Tabular row: `id,durationNanos,pass|fail,trace`.
    pub fn to_row(&self) -> String {
        format!(
            "{id}{d}{nanos}{d}{status}{d}{trace}",
            id = self.id,
            nanos = self.duration_nanos,
            status = self.status,
            trace = self.trace,
            d = TABULAR_DELIMITER,
        )
    }
}
