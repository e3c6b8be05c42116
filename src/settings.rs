//! Ambient, process-wide key/value settings.
//!
//! Tests may read and mutate these settings. The driver snapshots them before the first case and restores
//! that snapshot after every case, so a test that changes a setting cannot affect the ones that follow.

use std::collections::BTreeMap;
use std::env;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the settings map. Clones refer to the same map.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

/// A frozen copy of the settings map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSnapshot(BTreeMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the settings from the process environment (non-UTF-8 entries are skipped).
    pub fn from_env() -> Self {
        Self::from_pairs(env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))))
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Set `key`, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot(self.inner.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Replace the whole map with `snapshot`.
    pub fn restore(&self, snapshot: &SettingsSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = snapshot.0.clone();
    }
}
