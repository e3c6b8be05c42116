use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Classpath, ScopeError, SharedPrefixes, Unit};
use crate::settings::Settings;

/// Process-wide resolution context. Each name is defined at most once and shared by every scope.
#[derive(Debug)]
pub struct AmbientContext {
    classpath: Classpath,
    units: Mutex<HashMap<String, Unit>>,
}

impl AmbientContext {
    pub fn new(classpath: Classpath) -> Self {
        Self {
            classpath,
            units: Mutex::new(HashMap::new()),
        }
    }

    /// Register an already-defined unit (for example a coverage runtime set up before any scope exists).
    pub fn preload(&self, name: impl Into<String>, unit: Unit) {
        self.lock().insert(name.into(), unit);
    }

    pub fn resolve(&self, name: &str) -> Result<Unit, ScopeError> {
        if let Some(unit) = self.lock().get(name) {
            return Ok(Arc::clone(unit));
        }
        let unit = self
            .classpath
            .define(name)?
            .ok_or_else(|| ScopeError::NotFound(name.to_string()))?;
        // another thread may have raced us here; the first definition stays canonical
        Ok(Arc::clone(self.lock().entry(name.to_string()).or_insert(unit)))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Unit>> {
        self.units.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct ScopeState {
    units: HashMap<String, Unit>,
    requested: Vec<String>,
    seen: HashSet<String>,
    torn_down: bool,
}

/// The isolated environment of one test execution.
///
/// A scope is created per test case, used only by that case's worker threads and discarded at the end
/// of the case. After [`teardown`](Self::teardown) it refuses every further resolution.
pub struct ExecutionScope {
    id: u64,
    classpath: Classpath,
    ambient: Arc<AmbientContext>,
    shared: SharedPrefixes,
    settings: Settings,
    state: Mutex<ScopeState>,
}

impl ExecutionScope {
    pub(crate) fn new(
        id: u64,
        classpath: Classpath,
        ambient: Arc<AmbientContext>,
        shared: SharedPrefixes,
        settings: Settings,
    ) -> Self {
        Self {
            id,
            classpath,
            ambient,
            shared,
            settings,
            state: Mutex::new(ScopeState::default()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve `name` inside this scope.
    ///
    /// The name is logged (once) before resolution, so names that fail to resolve still appear in
    /// [`loaded_units`](Self::loaded_units).
    pub fn resolve(&self, name: &str) -> Result<Unit, ScopeError> {
        {
            let mut state = self.lock();
            if state.torn_down {
                return Err(ScopeError::TornDown(self.id));
            }
            if state.seen.insert(name.to_string()) {
                state.requested.push(name.to_string());
            }
            if self.shared.is_shared(name) {
                drop(state);
                return self.ambient.resolve(name);
            }
            if let Some(unit) = state.units.get(name) {
                return Ok(Arc::clone(unit));
            }
        }

        // defined outside the lock: a root may run arbitrary constructor code
        match self.classpath.define(name)? {
            Some(unit) => {
                let mut state = self.lock();
                if state.torn_down {
                    return Err(ScopeError::TornDown(self.id));
                }
                Ok(Arc::clone(state.units.entry(name.to_string()).or_insert(unit)))
            }
            None => {
                tracing::trace!(unit = name, scope = self.id, "falling back to ambient context");
                self.ambient.resolve(name)
            }
        }
    }

    /// Resolve `name` and downcast it to `T`.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ScopeError> {
        self.resolve(name)?
            .downcast::<T>()
            .map_err(|_| ScopeError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Every name requested so far, deduplicated, in first-encounter order.
    pub fn loaded_units(&self) -> Vec<String> {
        self.lock().requested.clone()
    }

    /// Drop every unit defined in this scope and return the final request log.
    pub fn teardown(&self) -> Vec<String> {
        let mut state = self.lock();
        state.torn_down = true;
        state.units.clear();
        state.requested.clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.lock().torn_down
    }

    fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ExecutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ExecutionScope")
            .field("id", &self.id)
            .field("defined", &state.units.len())
            .field("requested", &state.requested.len())
            .field("torn_down", &state.torn_down)
            .finish()
    }
}
