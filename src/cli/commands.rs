//! The `find` and `run` commands.
//!
//! Each returns `CliResult<ExitCode>`; printing and exiting is left to [`super::run_with`].

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RunnerConfig;
use crate::discovery::CaseFilter;
use crate::driver::{self, Selection};
use crate::harness::Backend;
use crate::isolation::{Classpath, IsolationBoundary};
use crate::patterns::PatternSet;
use crate::report::RunLedger;
use crate::settings::Settings;
use crate::supervisor::Supervisor;

use super::{CliError, CliResult, ExitCode};

// ============================================================================
// find
// ============================================================================

/// Arguments of the `find` command.
#[derive(Debug, Clone, Default)]
pub struct FindArgs {
    pub output: PathBuf,
    pub root: PathBuf,
    pub exclude_file: Option<PathBuf>,
    pub include_file: Option<PathBuf>,
    pub per_pattern: bool,
    pub patterns: Vec<String>,
}

/// Discover test cases below `args.root` and write them to `args.output`.
pub fn find<B: Backend + ?Sized>(backend: &B, args: FindArgs) -> CliResult<ExitCode> {
    if !args.root.is_dir() {
        return Err(CliError::usage(format!(
            "Error: '{}' does not exist or is not a directory",
            args.root.display()
        )));
    }

    let selection = selection(&args)?;
    let file = File::create(&args.output)
        .map_err(|e| CliError::usage(format!("Error creating '{}': {}", args.output.display(), e)))?;
    let mut out = BufWriter::new(file);

    let found = driver::find_tests(backend, &args.root, &selection, &mut out)
        .map_err(|e| CliError::diagnostic(e, ExitCode::FAILURE))?;
    tracing::info!(output = %args.output.display(), count = found.len(), "wrote test list");
    Ok(ExitCode::SUCCESS)
}

/// Build the include/exclude selection from pattern files and positional patterns.
fn selection(args: &FindArgs) -> CliResult<Selection> {
    let mut include = match &args.include_file {
        Some(path) => read_patterns(path)?,
        None => PatternSet::empty(),
    };
    for expr in &args.patterns {
        let parsed = PatternSet::parse_list(expr).map_err(|e| CliError::diagnostic(e, ExitCode::USAGE))?;
        include.extend(parsed);
    }
    if include.is_empty() {
        include = PatternSet::match_all();
    }

    let exclude = match &args.exclude_file {
        Some(path) => read_patterns(path)?,
        None => PatternSet::empty(),
    };

    Ok(if args.per_pattern {
        Selection::PerPattern {
            patterns: include,
            exclude,
        }
    } else {
        Selection::Filter(CaseFilter::new(include, exclude))
    })
}

fn read_patterns(path: &Path) -> CliResult<PatternSet> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("Error reading '{}': {}", path.display(), e)))?;
    PatternSet::from_lines(&text).map_err(|e| CliError::diagnostic(e, ExitCode::USAGE))
}

// ============================================================================
// run
// ============================================================================

/// Arguments of the `run` command. Unset paths fall back to the environment, then to the defaults.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub tests_file: PathBuf,
    pub timeout: Option<u64>,
    pub all_tests: Option<PathBuf>,
    pub failing_tests: Option<PathBuf>,
    pub timing: Option<PathBuf>,
    pub loaded_units: Option<PathBuf>,
    pub truncate: bool,
}

impl RunArgs {
    fn apply(&self, mut config: RunnerConfig) -> RunnerConfig {
        if let Some(secs) = self.timeout {
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(path) = &self.all_tests {
            config.all_tests = Some(path.clone());
        }
        if let Some(path) = &self.failing_tests {
            config.failing_tests = Some(path.clone());
        }
        if let Some(path) = &self.timing {
            config.timing = Some(path.clone());
        }
        if let Some(path) = &self.loaded_units {
            config.loaded_units = Some(path.clone());
        }
        if self.truncate {
            config.append = false;
        }
        config
    }
}

/// Run every identifier of `args.tests_file`. Succeeds once every case has been attempted, whatever
/// the individual outcomes.
pub fn run<B: Backend>(backend: Arc<B>, args: RunArgs) -> CliResult<ExitCode> {
    let env_config = RunnerConfig::from_env().map_err(|e| CliError::diagnostic(e, ExitCode::USAGE))?;
    let config = args.apply(env_config);
    run_with_config(backend, &args.tests_file, &config, Settings::from_env())
}

/// [`run`] with an explicit configuration and settings store.
pub fn run_with_config<B: Backend>(
    backend: Arc<B>,
    tests_file: &Path,
    config: &RunnerConfig,
    settings: Settings,
) -> CliResult<ExitCode> {
    let ids = driver::read_identifiers(tests_file).map_err(|e| CliError::diagnostic(e, ExitCode::USAGE))?;
    let ledger = RunLedger::open(config).map_err(|e| CliError::diagnostic(e, ExitCode::USAGE))?;

    let mut classpath = Classpath::new();
    for root in backend.unit_roots() {
        classpath.push(root);
    }
    classpath.extend(Classpath::from_env(&config.artifact_extension));

    let boundary = IsolationBoundary::new(classpath)
        .with_shared_prefixes(config.shared_prefixes.clone())
        .with_settings(settings);
    let supervisor = Supervisor::new(backend, boundary, Arc::new(ledger)).with_timeout(config.timeout);

    let report = driver::run_all(&supervisor, ids);
    if !report.aborted.is_empty() {
        tracing::warn!(aborted = report.aborted.len(), "some cases were abandoned");
    }
    Ok(ExitCode::SUCCESS)
}
