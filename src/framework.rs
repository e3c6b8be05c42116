//! The seam to the external test-execution framework.
//!
//! The harness never runs test code itself. A [`TestFramework`] describes containers, runs single cases
//! inside an [`ExecutionScope`] and reports lifecycle events to a [`RunListener`]. The types here are the
//! vocabulary shared by both sides.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::id::TestIdentifier;
use crate::isolation::{ExecutionScope, ScopeError};
use crate::supervisor::Interrupted;

/// Tree describing what a container would run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    display_name: String,
    container: Option<String>,
    method: Option<String>,
    children: Vec<Description>,
}

impl Description {
    /// An inner node (a container, or one instance of a parameterized container).
    pub fn suite(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            container: None,
            method: None,
            children: Vec::new(),
        }
    }

    /// A leaf naming a runnable case.
    pub fn case(container: impl Into<String>, method: impl Into<String>) -> Self {
        let container = container.into();
        let method = method.into();
        Self {
            display_name: format!("{method}({container})"),
            container: Some(container),
            method: Some(method),
            children: Vec::new(),
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_child(mut self, child: Description) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_child(&mut self, child: Description) {
        self.children.push(child);
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn children(&self) -> &[Description] {
        &self.children
    }

    pub fn is_case(&self) -> bool {
        self.method.is_some()
    }
}

/// A request to run exactly one case of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    container: String,
    method: String,
}

impl RunRequest {
    pub fn method(container: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            method: method.into(),
        }
    }

    pub fn for_id(id: &TestIdentifier) -> Self {
        Self::method(id.container(), id.case())
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn case(&self) -> &str {
        &self.method
    }
}

/// One stack frame of a [`Fault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    owner: String,
    method: String,
    location: Option<String>,
}

impl Frame {
    pub fn new(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}.{}({})", self.owner, self.method, location),
            None => write!(f, "{}.{}", self.owner, self.method),
        }
    }
}

/// A failure raised by test code: a message plus the frames it travelled through, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    message: String,
    frames: Vec<Frame>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Build a fault from a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new(panic_message(payload))
    }

    /// Append an (outer) frame.
    pub fn at(mut self, owner: impl Into<String>, method: impl Into<String>) -> Self {
        self.frames.push(Frame::new(owner, method));
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// True if any frame belongs to a method called `method`.
    pub fn has_frame(&self, method: &str) -> bool {
        self.frames.iter().any(|frame| frame.method == method)
    }

    /// Multi-line rendering: the message, then one `\tat frame` line per frame.
    pub fn render(&self) -> String {
        let mut out = self.message.clone();
        for frame in &self.frames {
            out.push_str("\n\tat ");
            out.push_str(&frame.to_string());
        }
        out.push('\n');
        out
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<ScopeError> for Fault {
    fn from(err: ScopeError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<Interrupted> for Fault {
    fn from(err: Interrupted) -> Self {
        Self::new(err.to_string())
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// A failure reported for a description. `method` is `None` for container-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    container: String,
    method: Option<String>,
    fault: Fault,
}

impl Failure {
    pub fn new(container: impl Into<String>, method: Option<String>, fault: Fault) -> Self {
        Self {
            container: container.into(),
            method,
            fault,
        }
    }

    pub fn of_case(id: &TestIdentifier, fault: Fault) -> Self {
        Self::new(id.container(), Some(id.case().to_string()), fault)
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }

    /// The multi-line rendered trace.
    pub fn trace(&self) -> String {
        self.fault.render()
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub run: usize,
    pub failed: usize,
    pub ignored: usize,
}

impl RunSummary {
    pub fn was_successful(&self) -> bool {
        self.failed == 0
    }
}

/// Lifecycle callbacks. Every method defaults to a no-op.
pub trait RunListener {
    fn run_started(&mut self, _container: &str) {}
    fn test_started(&mut self, _id: &TestIdentifier) {}
    fn test_finished(&mut self, _id: &TestIdentifier) {}
    fn test_failure(&mut self, _failure: &Failure) {}
    fn test_assumption_failure(&mut self, _failure: &Failure) {}
    fn test_ignored(&mut self, _id: &TestIdentifier) {}
    fn run_finished(&mut self, _summary: &RunSummary) {}
}

/// Errors a framework raises outside of its listener channel.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("unknown container '{0}'")]
    UnknownContainer(String),

    #[error("cannot run '{container}': {reason}")]
    Unrunnable { container: String, reason: String },

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

/// An external test-execution framework.
pub trait TestFramework: Send + Sync {
    /// Describe the cases `container` would run.
    fn describe(&self, container: &str) -> Result<Description, FrameworkError>;

    /// Run the single case named by `request` inside `scope`, reporting to `listener`.
    fn run(
        &self,
        request: &RunRequest,
        scope: &Arc<ExecutionScope>,
        listener: &mut dyn RunListener,
    ) -> Result<RunSummary, FrameworkError>;
}

impl<T: TestFramework + ?Sized> TestFramework for Arc<T> {
    fn describe(&self, container: &str) -> Result<Description, FrameworkError> {
        (**self).describe(container)
    }

    fn run(
        &self,
        request: &RunRequest,
        scope: &Arc<ExecutionScope>,
        listener: &mut dyn RunListener,
    ) -> Result<RunSummary, FrameworkError> {
        (**self).run(request, scope, listener)
    }
}
