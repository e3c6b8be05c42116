//! Names, wildcard matching and trace normalization shared by discovery, execution and reporting.
//!
//! Nothing here touches the filesystem, threads or the test framework. The classifier uses the
//! conventions and the matcher to decide what a test case is; the reporters use the separators and
//! [`normalize_trace`] to write the persisted line formats.
//!
//! Modules:
//! - [`conventions`]: well-known type, annotation and method names, stream delimiters, default file names.
//! - [`wildcard`]: the `*` matcher behind name patterns.
//! - [`trace`]: single-line, size-bounded failure traces.

pub mod conventions;
pub mod trace;
pub mod wildcard;

pub use trace::{MAX_TRACE_BYTES, normalize_trace, truncate_utf8};
pub use wildcard::wildcard_match;
