//! Runner configuration.
//!
//! Defaults follow the fixed file-name conventions; [`RunnerConfig::from_env`] layers environment
//! overrides on top and the command line layers its flags on top of that.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use isorun_core::conventions::{
    DEFAULT_ALL_TESTS_FILE, DEFAULT_ARTIFACT_EXTENSION, DEFAULT_FAILING_TESTS_FILE, DEFAULT_LOADED_UNITS_FILE,
    DEFAULT_TIMING_FILE,
};
use miette::Diagnostic;
use thiserror::Error;

use crate::isolation::SharedPrefixes;

pub const ENV_ALL_TESTS: &str = "ISORUN_ALL_TESTS";
pub const ENV_FAILING_TESTS: &str = "ISORUN_FAILING_TESTS";
pub const ENV_TIMING: &str = "ISORUN_TIMING";
pub const ENV_LOADED_UNITS: &str = "ISORUN_LOADED_UNITS";
pub const ENV_TIMEOUT_SECS: &str = "ISORUN_TIMEOUT_SECS";
pub const ENV_SHARED_PREFIXES: &str = "ISORUN_SHARED_PREFIXES";

/// Default per-case timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid timeout '{value}' in {source_name}")]
    #[diagnostic(
        code(isorun::config::timeout),
        help("give the timeout as a whole number of seconds; 0 disables it")
    )]
    InvalidTimeout { source_name: String, value: String },
}

/// Where the ledger streams go and how each case is supervised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub all_tests: Option<PathBuf>,
    pub failing_tests: Option<PathBuf>,
    pub timing: Option<PathBuf>,
    /// `Some` enables the loaded-units dump (coverage mode).
    pub loaded_units: Option<PathBuf>,
    /// Append to existing stream files instead of truncating them.
    pub append: bool,
    /// `None` waits for every case indefinitely.
    pub timeout: Option<Duration>,
    pub shared_prefixes: SharedPrefixes,
    pub artifact_extension: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            all_tests: Some(PathBuf::from(DEFAULT_ALL_TESTS_FILE)),
            failing_tests: Some(PathBuf::from(DEFAULT_FAILING_TESTS_FILE)),
            timing: Some(PathBuf::from(DEFAULT_TIMING_FILE)),
            loaded_units: None,
            append: true,
            timeout: Some(DEFAULT_TIMEOUT),
            shared_prefixes: SharedPrefixes::default(),
            artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus overrides read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by the `ISORUN_*` variable names.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        if let Some(p) = path(ENV_ALL_TESTS) {
            self.all_tests = Some(p);
        }
        if let Some(p) = path(ENV_FAILING_TESTS) {
            self.failing_tests = Some(p);
        }
        if let Some(p) = path(ENV_TIMING) {
            self.timing = Some(p);
        }
        if let Some(p) = path(ENV_LOADED_UNITS) {
            self.loaded_units = Some(p);
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout = parse_timeout(&value, ENV_TIMEOUT_SECS)?;
        }
        if let Some(value) = lookup(ENV_SHARED_PREFIXES) {
            for prefix in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                self.shared_prefixes = self.shared_prefixes.with(prefix);
            }
        }
        Ok(self)
    }

    pub fn with_all_tests(mut self, path: impl Into<PathBuf>) -> Self {
        self.all_tests = Some(path.into());
        self
    }

    pub fn with_failing_tests(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing_tests = Some(path.into());
        self
    }

    pub fn with_timing(mut self, path: impl Into<PathBuf>) -> Self {
        self.timing = Some(path.into());
        self
    }

    pub fn with_loaded_units(mut self, path: impl Into<PathBuf>) -> Self {
        self.loaded_units = Some(path.into());
        self
    }

    /// Turn coverage mode on with the default dump file name.
    pub fn with_coverage(self) -> Self {
        self.with_loaded_units(DEFAULT_LOADED_UNITS_FILE)
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shared_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.shared_prefixes = self.shared_prefixes.with(prefix);
        self
    }

    pub fn with_artifact_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = extension.into();
        self
    }

    pub fn coverage_enabled(&self) -> bool {
        self.loaded_units.is_some()
    }
}

/// Parse a timeout in whole seconds; `0` means no timeout.
pub fn parse_timeout(value: &str, source_name: &str) -> Result<Option<Duration>, ConfigError> {
    let secs: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidTimeout {
        source_name: source_name.to_string(),
        value: value.to_string(),
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
