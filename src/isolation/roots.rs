//! Unit roots: the places a scope defines fresh units from.

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fmt, fs, io};

use isorun_core::conventions::DEFAULT_ARTIFACT_EXTENSION;

use super::ScopeError;

/// A defined unit. Scopes hand these out; callers downcast to the concrete type they expect.
pub type Unit = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn() -> Unit + Send + Sync>;

/// A source of unit definitions.
///
/// `define` must produce a *new* instance on every call: two scopes defining the same name must never
/// share state through it.
pub trait UnitRoot: Send + Sync + fmt::Debug {
    /// Define `name`, or return `Ok(None)` when this root does not contain it.
    fn define(&self, name: &str) -> Result<Option<Unit>, ScopeError>;
}

/// Bytes of a compiled artifact read from a [`DirectoryRoot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedArtifact {
    pub name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Maps dotted names onto files below a directory: `a.b.C` -> `<dir>/a/b/C.<extension>`.
#[derive(Debug, Clone)]
pub struct DirectoryRoot {
    dir: PathBuf,
    extension: String,
}

impl DirectoryRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the artifact for `name` would live at.
    pub fn unit_path(&self, name: &str) -> PathBuf {
        let mut path = self.dir.clone();
        for segment in name.split('.') {
            path.push(segment);
        }
        path.set_extension(&self.extension);
        path
    }
}

impl UnitRoot for DirectoryRoot {
    fn define(&self, name: &str) -> Result<Option<Unit>, ScopeError> {
        let path = self.unit_path(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(Arc::new(LoadedArtifact {
                name: name.to_string(),
                path,
                bytes,
            }))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ScopeError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// In-memory root: each registered name is backed by a constructor called once per definition.
#[derive(Clone, Default)]
pub struct FactoryRoot {
    factories: HashMap<String, Factory>,
}

impl FactoryRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`; `factory` runs every time a scope defines it.
    pub fn insert<T, F>(&mut self, name: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into(), Arc::new(move || Arc::new(factory()) as Unit));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl fmt::Debug for FactoryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FactoryRoot").field("units", &names).finish()
    }
}

impl UnitRoot for FactoryRoot {
    fn define(&self, name: &str) -> Result<Option<Unit>, ScopeError> {
        Ok(self.factories.get(name).map(|factory| factory()))
    }
}

/// Ordered list of roots; the first root that defines a name wins.
#[derive(Debug, Clone, Default)]
pub struct Classpath {
    roots: Vec<Arc<dyn UnitRoot>>,
}

impl Classpath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read directory roots from `ISORUN_CLASSPATH` (platform path-list syntax). Unset means empty.
    pub fn from_env(extension: &str) -> Self {
        env::var_os("ISORUN_CLASSPATH")
            .map(|value| Self::from_dirs(env::split_paths(&value), extension))
            .unwrap_or_default()
    }

    pub fn from_dirs(dirs: impl IntoIterator<Item = PathBuf>, extension: &str) -> Self {
        let roots = dirs
            .into_iter()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| Arc::new(DirectoryRoot::new(dir).with_extension(extension)) as Arc<dyn UnitRoot>)
            .collect();
        Self { roots }
    }

    pub fn with_root(mut self, root: Arc<dyn UnitRoot>) -> Self {
        self.roots.push(root);
        self
    }

    pub fn push(&mut self, root: Arc<dyn UnitRoot>) {
        self.roots.push(root);
    }

    /// Append the roots of `other`, after this classpath's own.
    pub fn extend(&mut self, other: Classpath) {
        self.roots.extend(other.roots);
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn define(&self, name: &str) -> Result<Option<Unit>, ScopeError> {
        for root in &self.roots {
            if let Some(unit) = root.define(name)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }
}
