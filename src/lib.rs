#![forbid(unsafe_code)]
//! Isolated, supervised execution of pre-existing unit tests
//!
//! `isorun` discovers test cases in a tree of compiled containers and runs them one at a time, each
//! inside a fresh resolution scope and on its own interruptible worker. Results are streamed to
//! append-only files that downstream tools (mutation testers, fault localizers, coverage collectors)
//! consume: every started case, every failure with a one-line trace, one timing row per case and,
//! optionally, the set of units each case touched.
//!
//! The harness never inspects or executes tests itself. It talks to the test framework through the
//! [`Introspector`] and [`TestFramework`] traits; [`catalog::Catalog`] is an in-memory implementation.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`. Poisoned locks are recovered, never unwrapped.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Test panics**: A panic raised by test code is caught at the case boundary and reported as a failure of
//!   that case. A panic escaping the framework aborts only the current worker.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod framework;
pub mod harness;
pub mod id;
pub mod isolation;
pub mod patterns;
pub mod report;
pub mod settings;
pub mod supervisor;

pub use config::RunnerConfig;
pub use discovery::{CaseFilter, Classifier, Introspector};
pub use driver::{RunReport, Selection, find_tests, run_all};
pub use framework::{RunListener, TestFramework};
pub use harness::Backend;
pub use id::TestIdentifier;
pub use isolation::{Classpath, ExecutionScope, IsolationBoundary};
pub use patterns::{NamePattern, PatternSet};
pub use report::{ExecutionOutcome, RunLedger, Status};
pub use settings::Settings;
pub use supervisor::Supervisor;
