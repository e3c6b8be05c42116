//! An in-memory [`Backend`]: containers, cases and units registered from code.
//!
//! The catalog behaves like the classic JVM test framework where the harness depends on it:
//!
//! - a legacy container without `test*` methods describes a single `warning` case on the legacy suite
//!   failure type;
//! - a marker container without marked methods describes an `initializationError` case;
//! - a request for a case the container does not have runs an `initializationError` stand-in;
//! - a failing constructor is reported through a `createTest` frame;
//! - a panic in a constructor or case body becomes a failure of that case.
//!
//! Every registered container is also a unit, so the supervisor can resolve it inside the case's scope.
//!
//! ```rust
//! use isorun::catalog::{Catalog, ContainerBuilder};
//! use isorun::framework::Fault;
//!
//! let catalog = Catalog::new().with(
//!     ContainerBuilder::new("pkg.Foo")
//!         .test("testA", |_| Ok(()))
//!         .test("testB", |_| Err(Fault::new("boom"))),
//! );
//! # let _ = catalog;
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use isorun_core::conventions::{
    CREATE_TEST_FRAME, INITIALIZATION_ERROR_METHOD, LEGACY_BASE_TYPE, LEGACY_SUITE_FAILURE_TYPE,
    LEGACY_WARNING_METHOD, TEST_MARKER, THEORY_MARKER,
};

use crate::discovery::{
    derives_from_legacy_base, ClassifyError, ContainerInfo, IntrospectError, Introspector, MethodInfo, Modifiers,
    Returns,
};
use crate::framework::{
    Description, Failure, Fault, FrameworkError, RunListener, RunRequest, RunSummary, TestFramework,
};
use crate::harness::Backend;
use crate::id::TestIdentifier;
use crate::isolation::{ExecutionScope, FactoryRoot, UnitRoot};
use crate::settings::Settings;

/// The owner name used for frames the catalog adds on behalf of the framework runner.
pub const RUNNER_FRAME_OWNER: &str = "org.junit.runners.BlockJUnit4ClassRunner";
const FILTER_FRAME_OWNER: &str = "org.junit.internal.requests.FilterRequest";
const LEGACY_RUNNER_OWNER: &str = "junit.framework.TestSuite";

/// Body of a case or constructor.
pub type CaseBody = Arc<dyn Fn(&CaseContext) -> Result<(), Fault> + Send + Sync>;

/// What a running case can reach: its scope, the ambient settings and its parameter instance.
#[derive(Debug, Clone)]
pub struct CaseContext {
    scope: Arc<ExecutionScope>,
    id: TestIdentifier,
    instance: Option<usize>,
}

impl CaseContext {
    pub fn id(&self) -> &TestIdentifier {
        &self.id
    }

    pub fn scope(&self) -> &Arc<ExecutionScope> {
        &self.scope
    }

    pub fn settings(&self) -> &Settings {
        self.scope.settings()
    }

    /// Index of the parameter instance being run, for parameterized containers.
    pub fn instance(&self) -> Option<usize> {
        self.instance
    }

    /// Resolve a unit inside the case's scope.
    pub fn resolve<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, Fault> {
        self.scope.resolve_as::<T>(name).map_err(Fault::from)
    }
}

struct CaseEntry {
    method: MethodInfo,
    body: Option<CaseBody>,
    ignored: bool,
}

/// A registered container.
pub struct ContainerDef {
    info: ContainerInfo,
    constructor: Option<CaseBody>,
    cases: Vec<CaseEntry>,
    instances: Vec<String>,
}

impl ContainerDef {
    pub fn info(&self) -> &ContainerInfo {
        &self.info
    }
}

/// Declarative builder for a [`ContainerDef`].
pub struct ContainerBuilder {
    def: ContainerDef,
}

impl ContainerBuilder {
    /// A public, concrete container.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: ContainerDef {
                info: ContainerInfo::new(name),
                constructor: None,
                cases: Vec::new(),
                instances: Vec::new(),
            },
        }
    }

    /// A container deriving from the legacy base type.
    pub fn legacy(name: impl Into<String>) -> Self {
        Self::new(name).extends(LEGACY_BASE_TYPE)
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.def.info = self.def.info.with_modifiers(modifiers);
        self
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.def.info = self.def.info.extends(superclass);
        self
    }

    /// A marker-annotated test case.
    pub fn test<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&CaseContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.case(MethodInfo::new(name).with_annotation(TEST_MARKER), body)
    }

    /// A theory-annotated test case.
    pub fn theory<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&CaseContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.case(MethodInfo::new(name).with_annotation(THEORY_MARKER), body)
    }

    /// A marker-annotated case the framework skips.
    pub fn ignored(mut self, name: &str) -> Self {
        self.def.cases.push(CaseEntry {
            method: MethodInfo::new(name).with_annotation(TEST_MARKER),
            body: None,
            ignored: true,
        });
        self
    }

    /// A case with an explicit method shape (use for naming-convention cases).
    pub fn case<F>(mut self, method: MethodInfo, body: F) -> Self
    where
        F: Fn(&CaseContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.def.cases.push(CaseEntry {
            method,
            body: Some(Arc::new(body)),
            ignored: false,
        });
        self
    }

    /// A declared method without a body (helpers, non-test methods).
    pub fn method(mut self, method: MethodInfo) -> Self {
        self.def.cases.push(CaseEntry {
            method,
            body: None,
            ignored: false,
        });
        self
    }

    /// Code run before every case; a failure here is a construction failure.
    pub fn constructor<F>(mut self, body: F) -> Self
    where
        F: Fn(&CaseContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.def.constructor = Some(Arc::new(body));
        self
    }

    /// Make the container parameterized with one instance per label (e.g. `[0]`, `[1]`).
    pub fn parameterized<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.def.instances = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(mut self) -> ContainerDef {
        for case in &self.def.cases {
            self.def.info.push_method(case.method.clone());
        }
        self.def
    }
}

impl From<ContainerBuilder> for ContainerDef {
    fn from(builder: ContainerBuilder) -> Self {
        builder.build()
    }
}

/// In-memory collaborator: introspector, test framework and unit root in one.
#[derive(Default)]
pub struct Catalog {
    containers: Vec<ContainerDef>,
    index: HashMap<String, usize>,
    types: HashMap<String, ContainerInfo>,
    units: FactoryRoot,
}

impl Catalog {
    /// An empty catalog that already knows the legacy base type.
    pub fn new() -> Self {
        let mut catalog = Self::default();
        catalog.declare(
            ContainerInfo::new(LEGACY_BASE_TYPE)
                .with_modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
                .extends("junit.framework.Assert"),
        );
        catalog
    }

    pub fn with(mut self, def: impl Into<ContainerDef>) -> Self {
        self.register(def);
        self
    }

    /// Register a container; a later registration under the same name replaces the earlier one.
    pub fn register(&mut self, def: impl Into<ContainerDef>) -> &mut Self {
        let def = def.into();
        let name = def.info.name().to_string();
        let unit = def.info.clone();
        self.units.insert(name.clone(), move || unit.clone());

        match self.index.get(&name) {
            Some(&i) => self.containers[i] = def,
            None => {
                self.index.insert(name, self.containers.len());
                self.containers.push(def);
            }
        }
        self
    }

    /// Make a non-container type known to introspection (e.g. an abstract base).
    pub fn declare(&mut self, info: ContainerInfo) -> &mut Self {
        self.types.insert(info.name().to_string(), info);
        self
    }

    pub fn with_type(mut self, info: ContainerInfo) -> Self {
        self.declare(info);
        self
    }

    /// Register a unit defined afresh in every scope; `factory` builds its initial state.
    pub fn unit<T, F>(mut self, name: &str, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.units.insert(name, factory);
        self
    }

    pub fn container_names(&self) -> impl Iterator<Item = &str> {
        self.containers.iter().map(|c| c.info.name())
    }

    fn lookup(&self, container: &str) -> Result<&ContainerDef, FrameworkError> {
        self.index
            .get(container)
            .map(|&i| &self.containers[i])
            .ok_or_else(|| FrameworkError::UnknownContainer(container.to_string()))
    }

    fn is_legacy(&self, info: &ContainerInfo) -> bool {
        derives_from_legacy_base(info, self)
    }

    fn runnable_cases<'a>(&self, def: &'a ContainerDef) -> Vec<&'a CaseEntry> {
        if self.is_legacy(&def.info) {
            def.cases
                .iter()
                .filter(|c| c.body.is_some() && is_legacy_test_name(&c.method))
                .collect()
        } else {
            def.cases
                .iter()
                .filter(|c| c.method.has_annotation(TEST_MARKER) || c.method.has_annotation(THEORY_MARKER))
                .collect()
        }
    }

    fn run_case(
        &self,
        def: &ContainerDef,
        id: &TestIdentifier,
        case: &CaseEntry,
        ctx: &CaseContext,
        listener: &mut dyn RunListener,
        summary: &mut RunSummary,
    ) {
        if case.ignored || case.body.is_none() {
            listener.test_ignored(id);
            summary.ignored += 1;
            return;
        }

        listener.test_started(id);
        summary.run += 1;

        let constructed = match &def.constructor {
            Some(constructor) => {
                guarded(constructor, ctx).map_err(|fault| fault.at(RUNNER_FRAME_OWNER, CREATE_TEST_FRAME))
            }
            None => Ok(()),
        };
        let result = constructed.and_then(|()| match &case.body {
            Some(body) => guarded(body, ctx),
            None => Ok(()),
        });

        if let Err(fault) = result {
            summary.failed += 1;
            listener.test_failure(&Failure::of_case(id, fault));
        }
        listener.test_finished(id);
    }
}

/// The legacy convention: public, parameterless, returns nothing, name starts with `test`.
fn is_legacy_test_name(method: &MethodInfo) -> bool {
    method.name().starts_with("test")
        && method.parameter_count() == 0
        && method.modifiers().is_public()
        && method.returns() == Returns::Unit
}

fn guarded(body: &CaseBody, ctx: &CaseContext) -> Result<(), Fault> {
    match panic::catch_unwind(AssertUnwindSafe(|| body(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(Fault::from_panic(&*payload)),
    }
}

/// Split `testFib[2]` into `("testFib", Some(2))` when `[2]` is one of the instance labels.
fn split_instance<'a>(case: &'a str, labels: &[String]) -> (&'a str, Option<usize>) {
    for (i, label) in labels.iter().enumerate() {
        if let Some(method) = case.strip_suffix(label.as_str()) {
            if !method.is_empty() {
                return (method, Some(i));
            }
        }
    }
    (case, None)
}

impl Introspector for Catalog {
    fn inspect(&self, container: &str) -> Result<ContainerInfo, IntrospectError> {
        if let Some(&i) = self.index.get(container) {
            return Ok(self.containers[i].info.clone());
        }
        self.types
            .get(container)
            .cloned()
            .ok_or_else(|| IntrospectError::NotFound(container.to_string()))
    }
}

impl TestFramework for Catalog {
    fn describe(&self, container: &str) -> Result<Description, FrameworkError> {
        let def = self.lookup(container)?;
        let mut root = Description::suite(container).with_container(container);
        let cases = self.runnable_cases(def);

        if !def.instances.is_empty() {
            for label in &def.instances {
                let mut instance = Description::suite(label.clone());
                for case in &cases {
                    instance.push_child(Description::case(container, format!("{}{label}", case.method.name())));
                }
                root.push_child(instance);
            }
        } else if cases.is_empty() && self.is_legacy(&def.info) {
            root.push_child(Description::case(LEGACY_SUITE_FAILURE_TYPE, LEGACY_WARNING_METHOD));
        } else if cases.is_empty() {
            root.push_child(Description::case(container, INITIALIZATION_ERROR_METHOD));
        } else {
            for case in cases {
                root.push_child(Description::case(container, case.method.name()));
            }
        }
        Ok(root)
    }

    fn run(
        &self,
        request: &RunRequest,
        scope: &Arc<ExecutionScope>,
        listener: &mut dyn RunListener,
    ) -> Result<RunSummary, FrameworkError> {
        let def = self.lookup(request.container())?;
        let container = request.container();
        let mut summary = RunSummary::default();
        listener.run_started(container);

        let (method, instance) = split_instance(request.case(), &def.instances);
        let case = self.runnable_cases(def).into_iter().find(|c| c.method.name() == method);

        match case {
            Some(case) => {
                let id = TestIdentifier::new(container, request.case());
                let ctx = CaseContext {
                    scope: Arc::clone(scope),
                    id: id.clone(),
                    instance,
                };
                self.run_case(def, &id, case, &ctx, listener, &mut summary);
            }
            None if self.is_legacy(&def.info) && self.runnable_cases(def).is_empty() => {
                let id = TestIdentifier::new(LEGACY_SUITE_FAILURE_TYPE, LEGACY_WARNING_METHOD);
                listener.test_started(&id);
                listener.test_failure(&Failure::of_case(
                    &id,
                    Fault::new(format!("junit.framework.AssertionFailedError: No tests found in {container}"))
                        .at(LEGACY_RUNNER_OWNER, LEGACY_WARNING_METHOD),
                ));
                listener.test_finished(&id);
                summary.run += 1;
                summary.failed += 1;
            }
            None => {
                let id = TestIdentifier::new(container, INITIALIZATION_ERROR_METHOD);
                listener.test_started(&id);
                listener.test_failure(&Failure::of_case(
                    &id,
                    Fault::new(format!(
                        "java.lang.Exception: No tests found matching Method {method}({container}) from {container}"
                    ))
                    .at(FILTER_FRAME_OWNER, "getRunner"),
                ));
                listener.test_finished(&id);
                summary.run += 1;
                summary.failed += 1;
            }
        }

        listener.run_finished(&summary);
        Ok(summary)
    }
}

impl Backend for Catalog {
    /// Every registered container, in registration order; `root` is not consulted.
    fn containers(&self, _root: &Path) -> Result<Vec<String>, ClassifyError> {
        Ok(self.container_names().map(str::to_string).collect())
    }

    fn unit_roots(&self) -> Vec<Arc<dyn UnitRoot>> {
        vec![Arc::new(self.units.clone())]
    }
}
