//! End-to-end runs through the supervisor: ledger streams, scope isolation, timeouts and settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use isorun::catalog::{CaseContext, Catalog, ContainerBuilder};
use isorun::cli::commands;
use isorun::cli::ExitCode;
use isorun::config::RunnerConfig;
use isorun::framework::Fault;
use isorun::isolation::{Classpath, IsolationBoundary, SharedPrefixes};
use isorun::{Backend, RunLedger, Settings, Supervisor, TestIdentifier};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> RunnerConfig {
        RunnerConfig::new()
            .with_all_tests(self.path("all_tests"))
            .with_failing_tests(self.path("failing-tests.txt"))
            .with_timing(self.path("tests.txt"))
            .with_append(false)
            .with_timeout(Some(Duration::from_secs(10)))
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    /// Timing rows with the duration column masked.
    fn timing_rows(&self) -> Vec<String> {
        self.read("tests.txt")
            .lines()
            .map(|row| {
                let mut fields = row.splitn(3, ',');
                let id = fields.next().unwrap_or_default();
                let _nanos = fields.next();
                format!("{id},<nanos>,{}", fields.next().unwrap_or_default())
            })
            .collect()
    }

    fn run(&self, catalog: Catalog, config: &RunnerConfig, tests: &[&str]) {
        let tests_file = self.path("tests.lst");
        fs::write(&tests_file, tests.join("\n")).unwrap();
        let code = commands::run_with_config(Arc::new(catalog), &tests_file, config, Settings::new()).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }
}

fn supervisor(catalog: Catalog, ledger: RunLedger, settings: Settings) -> Supervisor<Catalog> {
    let mut classpath = Classpath::new();
    for root in catalog.unit_roots() {
        classpath.push(root);
    }
    let boundary = IsolationBoundary::new(classpath).with_settings(settings);
    Supervisor::new(Arc::new(catalog), boundary, Arc::new(ledger)).with_timeout(Some(Duration::from_secs(10)))
}

fn ids(raw: &[&str]) -> Vec<TestIdentifier> {
    raw.iter().map(|s| TestIdentifier::parse(s).unwrap()).collect()
}

fn foo() -> ContainerBuilder {
    ContainerBuilder::new("pkg.Foo")
        .test("testA", |_| Ok(()))
        .test("testB", |_| Err(Fault::new("java.lang.AssertionError: boom").at("pkg.Foo", "testB")))
}

// ========================================
// Ledger streams
// ========================================

#[test]
fn run_writes_all_three_streams() {
    let ws = Workspace::new();
    ws.run(Catalog::new().with(foo()), &ws.config(), &["pkg.Foo::testA", "pkg.Foo::testB"]);

    insta::assert_snapshot!(ws.read("all_tests"), @r"
    pkg.Foo::testA
    pkg.Foo::testB
    ");
    insta::assert_snapshot!(ws.read("failing-tests.txt"), @r"
    --- pkg.Foo::testB
    java.lang.AssertionError: boom at pkg.Foo.testB
    ");
    assert_eq!(
        ws.timing_rows(),
        [
            "pkg.Foo::testA,<nanos>,pass,",
            "pkg.Foo::testB,<nanos>,fail,java.lang.AssertionError: boom at pkg.Foo.testB",
        ]
    );
}

#[test]
fn streams_are_appended_across_runs_by_default() {
    let ws = Workspace::new();
    let config = ws.config().with_append(true);
    ws.run(Catalog::new().with(foo()), &config, &["pkg.Foo::testA"]);
    ws.run(Catalog::new().with(foo()), &config, &["pkg.Foo::testA"]);
    assert_eq!(ws.read("all_tests"), "pkg.Foo::testA\npkg.Foo::testA\n");
}

#[test]
fn panicking_case_is_reported_as_a_failure() {
    let ws = Workspace::new();
    let catalog = Catalog::new().with(ContainerBuilder::new("pkg.Foo").test("testPanics", |_| panic!("kaboom")));
    ws.run(catalog, &ws.config(), &["pkg.Foo::testPanics"]);

    assert_eq!(ws.timing_rows(), ["pkg.Foo::testPanics,<nanos>,fail,kaboom"]);
    assert_eq!(ws.read("failing-tests.txt"), "--- pkg.Foo::testPanics\nkaboom\n");
}

#[test]
fn constructor_failure_is_attributed_to_the_container() {
    let ws = Workspace::new();
    let catalog = Catalog::new().with(
        ContainerBuilder::new("pkg.Broken")
            .constructor(|_| Err(Fault::new("java.lang.RuntimeException: no fixture")))
            .test("testA", |_| Ok(())),
    );
    let config = ws.config().with_loaded_units(ws.path("loaded-units.txt"));
    ws.run(catalog, &config, &["pkg.Broken::testA"]);

    insta::assert_snapshot!(ws.read("failing-tests.txt"), @r"
    --- pkg.Broken
    java.lang.RuntimeException: no fixture at org.junit.runners.BlockJUnit4ClassRunner.createTest
    ");
    assert_eq!(ws.timing_rows().len(), 1);
    assert!(ws.timing_rows()[0].starts_with("pkg.Broken::testA,<nanos>,fail,"));
    assert_eq!(ws.read("loaded-units.txt"), "");
}

#[test]
fn unknown_case_fails_with_a_container_block() {
    let ws = Workspace::new();
    ws.run(Catalog::new().with(foo()), &ws.config(), &["pkg.Foo::testMissing"]);

    let failing = ws.read("failing-tests.txt");
    assert!(failing.starts_with("--- pkg.Foo\n"), "{failing}");
    assert!(failing.contains("No tests found matching Method testMissing(pkg.Foo)"));
    let rows = ws.timing_rows();
    assert_eq!(rows.len(), 2, "{rows:?}");
    let stand_in = rows[0].strip_prefix("pkg.Foo::initializationError,<nanos>,fail,").unwrap();
    let requested = rows[1].strip_prefix("pkg.Foo::testMissing,<nanos>,fail,").unwrap();
    assert_eq!(stand_in, requested);
    assert!(requested.contains("No tests found matching Method testMissing(pkg.Foo)"));
}

#[test]
fn loaded_units_are_dumped_per_case() {
    let ws = Workspace::new();
    let catalog = Catalog::new()
        .unit("pkg.Counter", || AtomicUsize::new(0))
        .with(ContainerBuilder::new("pkg.Foo").test("testA", |ctx| {
            ctx.resolve::<AtomicUsize>("pkg.Counter")?;
            Ok(())
        }));
    let config = ws.config().with_loaded_units(ws.path("loaded-units.txt"));
    ws.run(catalog, &config, &["pkg.Foo::testA"]);

    assert_eq!(ws.read("loaded-units.txt"), "pkg.Foo::testA#pkg.Foo,pkg.Counter,\n");
}

// ========================================
// Isolation
// ========================================

fn bump(ctx: &CaseContext) -> Result<(), Fault> {
    let counter = ctx.resolve::<AtomicUsize>("pkg.Counter")?;
    match counter.fetch_add(1, Ordering::SeqCst) {
        0 => Ok(()),
        seen => Err(Fault::new(format!("counter already at {seen}"))),
    }
}

#[test]
fn unit_state_does_not_leak_between_cases() {
    let catalog = Catalog::new()
        .unit("pkg.Counter", || AtomicUsize::new(0))
        .with(ContainerBuilder::new("pkg.Foo").test("testFirst", bump).test("testSecond", bump));
    let supervisor = supervisor(catalog, RunLedger::discard(), Settings::new());

    let report = isorun::run_all(&supervisor, ids(&["pkg.Foo::testFirst", "pkg.Foo::testSecond", "pkg.Foo::testFirst"]));
    assert_eq!(report.passed.len(), 3, "{report:?}");
    assert!(report.is_success());
}

#[test]
fn shared_units_keep_state_across_cases() {
    let catalog = Catalog::new()
        .unit("pkg.Counter", || AtomicUsize::new(0))
        .with(ContainerBuilder::new("pkg.Foo").test("testFirst", bump).test("testSecond", bump));
    let mut classpath = Classpath::new();
    for root in catalog.unit_roots() {
        classpath.push(root);
    }
    let boundary =
        IsolationBoundary::new(classpath).with_shared_prefixes(SharedPrefixes::default().with("pkg.Counter"));
    let supervisor = Supervisor::new(Arc::new(catalog), boundary, Arc::new(RunLedger::discard()));

    let report = isorun::run_all(&supervisor, ids(&["pkg.Foo::testFirst", "pkg.Foo::testSecond"]));
    assert_eq!(report.passed, ids(&["pkg.Foo::testFirst"]));
    assert_eq!(report.failed, ids(&["pkg.Foo::testSecond"]));
}

#[test]
fn settings_are_restored_after_every_case() {
    let catalog = Catalog::new().with(
        ContainerBuilder::new("pkg.Env")
            .test("testMutates", |ctx| {
                ctx.settings().set("user.dir", "/elsewhere");
                ctx.settings().set("scratch", "1");
                Ok(())
            })
            .test("testObserves", |ctx| {
                let settings = ctx.settings();
                if settings.get("user.dir").as_deref() != Some("/work") || settings.get("scratch").is_some() {
                    return Err(Fault::new("settings leaked from the previous case"));
                }
                Ok(())
            }),
    );
    let settings = Settings::from_pairs([("user.dir", "/work")]);
    let supervisor = supervisor(catalog, RunLedger::discard(), settings.clone());

    let report = isorun::run_all(&supervisor, ids(&["pkg.Env::testMutates", "pkg.Env::testObserves"]));
    assert!(report.is_success(), "{report:?}");
    assert_eq!(settings.get("user.dir").as_deref(), Some("/work"));
    assert_eq!(settings.len(), 1);
}

// ========================================
// Supervision
// ========================================

fn hang(_: &CaseContext) -> Result<(), Fault> {
    while !isorun::supervisor::is_interrupted() {
        std::thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}

#[test]
fn hanging_case_is_abandoned_and_the_run_continues() {
    let ws = Workspace::new();
    let catalog = Catalog::new()
        .with(ContainerBuilder::new("pkg.Slow").test("testHang", hang))
        .with(foo());
    let config = ws.config().with_timeout(Some(Duration::from_millis(200)));
    ws.run(catalog, &config, &["pkg.Slow::testHang", "pkg.Foo::testA"]);
    // the interrupted worker returns normally; give it time to try writing a row
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(ws.read("all_tests"), "pkg.Slow::testHang\npkg.Foo::testA\n");
    assert_eq!(
        ws.read("failing-tests.txt"),
        "--- pkg.Slow::testHang\naborted: timed out after 200ms\n"
    );
    assert_eq!(ws.timing_rows(), ["pkg.Foo::testA,<nanos>,pass,"]);
}

#[test]
fn slow_case_writes_nothing_after_it_is_abandoned() {
    let ws = Workspace::new();
    let catalog = Catalog::new()
        .with(ContainerBuilder::new("pkg.Slow").test("testLate", |_| {
            std::thread::sleep(Duration::from_millis(600));
            Ok(())
        }))
        .with(foo());
    let config = ws
        .config()
        .with_timeout(Some(Duration::from_millis(100)))
        .with_loaded_units(ws.path("loaded-units.txt"));
    ws.run(catalog, &config, &["pkg.Slow::testLate", "pkg.Foo::testA"]);
    std::thread::sleep(Duration::from_millis(900));

    assert_eq!(ws.read("all_tests"), "pkg.Slow::testLate\npkg.Foo::testA\n");
    assert_eq!(
        ws.read("failing-tests.txt"),
        "--- pkg.Slow::testLate\naborted: timed out after 100ms\n"
    );
    assert_eq!(ws.timing_rows(), ["pkg.Foo::testA,<nanos>,pass,"]);
    assert_eq!(ws.read("loaded-units.txt"), "pkg.Foo::testA#pkg.Foo,\n");
}

#[test]
fn supervise_reports_why_a_case_was_abandoned() {
    let catalog = Catalog::new().with(ContainerBuilder::new("pkg.Slow").test("testHang", hang));
    let supervisor = supervisor(catalog, RunLedger::discard(), Settings::new())
        .with_timeout(Some(Duration::from_millis(50)));
    let id = TestIdentifier::new("pkg.Slow", "testHang");

    let abort = supervisor.supervise(&id).unwrap_err();
    assert!(matches!(abort, isorun::supervisor::Abort::TimedOut(_)));
    assert!(supervisor.run(&id).is_none());
}

#[test]
fn missing_container_aborts_only_that_case() {
    let ws = Workspace::new();
    ws.run(Catalog::new().with(foo()), &ws.config(), &["pkg.Gone::testA", "pkg.Foo::testA"]);

    let failing = ws.read("failing-tests.txt");
    assert!(failing.starts_with("--- pkg.Gone::testA\naborted: "), "{failing}");
    assert_eq!(ws.timing_rows(), ["pkg.Foo::testA,<nanos>,pass,"]);
}

#[test]
fn empty_test_list_writes_nothing() {
    let ws = Workspace::new();
    ws.run(Catalog::new().with(foo()), &ws.config(), &[]);
    assert_eq!(ws.read("all_tests"), "");
    assert!(Path::new(&ws.path("tests.txt")).exists());
}
