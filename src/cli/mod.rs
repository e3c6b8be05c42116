//! Command-line front end.
//!
//! ## Commands
//!
//! - `find <OUTPUT> <ROOT> [PATTERN]...` - discover test cases and write one identifier per line
//! - `run <TESTS_FILE>` - run every listed case, each in its own isolated scope
//!
//! ## Design
//!
//! The harness does not know how to inspect or execute tests by itself, so there is no stand-alone
//! binary: a harness binary builds its [`Backend`] and hands it to [`run_with`].
//! Commands report problems as [`CliError`] values; [`run_with`] prints them and picks the exit status.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::harness::Backend;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Process exit status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Bad arguments or unreadable inputs.
    pub const USAGE: ExitCode = ExitCode(2);
}

/// A command failure: what to print on stderr and which status to exit with.
#[derive(Debug)]
pub struct CliError {
    /// Printed as-is
    pub message: String,
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Exit status 2.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }

    /// Render a diagnostic with its code and help text.
    pub fn diagnostic<E>(err: E, exit_code: ExitCode) -> Self
    where
        E: miette::Diagnostic + Send + Sync + 'static,
    {
        Self::new(format!("{:?}", miette::Report::new(err)), exit_code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Discover and run test cases, each in a fresh isolated scope
#[derive(Parser, Debug)]
#[command(name = "isorun")]
#[command(version = VERSION)]
#[command(about = "Discover and run test cases, each in a fresh isolated scope", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover test cases below a root and write their identifiers
    Find {
        /// File the identifiers are written to (truncated)
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        /// Directory to scan for compiled containers
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        /// File of patterns to exclude, one per line
        #[arg(long, value_name = "FILE")]
        exclude_file: Option<PathBuf>,
        /// File of patterns to include, one per line
        #[arg(long, value_name = "FILE")]
        include_file: Option<PathBuf>,
        /// Filter once per include pattern and concatenate the results
        #[arg(long)]
        per_pattern: bool,
        /// Include patterns (`container::case`, comma-separated lists allowed); default `*::*`
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,
    },

    /// Run every test listed in a file
    Run {
        /// File with one `container::case` identifier per line
        #[arg(value_name = "TESTS_FILE")]
        tests_file: PathBuf,
        /// Per-case timeout in seconds (0 disables it)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// all-tests stream path
        #[arg(long, value_name = "FILE")]
        all_tests: Option<PathBuf>,
        /// failing-tests stream path
        #[arg(long, value_name = "FILE")]
        failing_tests: Option<PathBuf>,
        /// tabular (timing) stream path
        #[arg(long, value_name = "FILE")]
        timing: Option<PathBuf>,
        /// Enable the loaded-units dump and write it here
        #[arg(long, value_name = "FILE")]
        loaded_units: Option<PathBuf>,
        /// Truncate the output streams instead of appending
        #[arg(long)]
        truncate: bool,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point for a harness binary.
///
/// Initializes logging, parses the process arguments and runs the command against `backend`.
/// This is the only place where `process::exit` is called.
pub fn run_with<B: Backend>(backend: B) {
    // RUST_LOG overrides the `info` default
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let cli = Cli::parse();

    match execute(cli, Arc::new(backend)) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute a parsed command and return its exit code.
pub fn execute<B: Backend>(cli: Cli, backend: Arc<B>) -> CliResult<ExitCode> {
    match cli.command {
        Command::Find {
            output,
            root,
            exclude_file,
            include_file,
            per_pattern,
            patterns,
        } => commands::find(
            backend.as_ref(),
            commands::FindArgs {
                output,
                root,
                exclude_file,
                include_file,
                per_pattern,
                patterns,
            },
        ),
        Command::Run {
            tests_file,
            timeout,
            all_tests,
            failing_tests,
            timing,
            loaded_units,
            truncate,
        } => commands::run(
            backend,
            commands::RunArgs {
                tests_file,
                timeout,
                all_tests,
                failing_tests,
                timing,
                loaded_units,
                truncate,
            },
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
