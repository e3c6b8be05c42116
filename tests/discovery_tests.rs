//! Discovery through the in-memory catalog: which containers qualify, how their cases are named and
//! how include/exclude patterns select them.

use std::fs;
use std::path::Path;

use isorun::catalog::{Catalog, ContainerBuilder};
use isorun::discovery::{CaseFilter, Classifier, ContainerInfo, MethodInfo, Modifiers};
use isorun::driver::{self, Selection};
use isorun::framework::Fault;
use isorun::patterns::PatternSet;
use isorun::TestIdentifier;

fn ids(raw: &[&str]) -> Vec<TestIdentifier> {
    raw.iter().map(|s| TestIdentifier::parse(s).unwrap()).collect()
}

fn ok(_: &isorun::catalog::CaseContext) -> Result<(), Fault> {
    Ok(())
}

fn candidates(catalog: &Catalog, container: &str) -> Vec<TestIdentifier> {
    Classifier::new(catalog, catalog).candidates(container).unwrap()
}

// ========================================
// Containers
// ========================================

#[test]
fn catch_all_lists_cases_in_declaration_order() {
    let catalog = Catalog::new().with(ContainerBuilder::new("pkg.Foo").test("testB", ok).test("testA", ok));
    assert_eq!(candidates(&catalog, "pkg.Foo"), ids(&["pkg.Foo::testB", "pkg.Foo::testA"]));
}

#[test]
fn container_without_markers_is_not_a_test_container() {
    let catalog = Catalog::new().with(ContainerBuilder::new("pkg.Util").method(MethodInfo::new("helper")));
    assert!(candidates(&catalog, "pkg.Util").is_empty());
}

#[test]
fn abstract_and_anonymous_containers_are_skipped() {
    let catalog = Catalog::new()
        .with(
            ContainerBuilder::new("pkg.AbstractBase")
                .modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
                .test("testA", ok),
        )
        .with(ContainerBuilder::new("pkg.Foo$1").test("testA", ok))
        .with(ContainerBuilder::new("pkg.Hidden").modifiers(Modifiers::NONE).test("testA", ok));

    assert!(candidates(&catalog, "pkg.AbstractBase").is_empty());
    assert!(candidates(&catalog, "pkg.Foo$1").is_empty());
    assert!(candidates(&catalog, "pkg.Hidden").is_empty());
}

#[test]
fn parameterized_container_yields_one_case_per_instance() {
    let catalog = Catalog::new().with(
        ContainerBuilder::new("pkg.Fib")
            .parameterized(["[0]", "[1]", "[2]"])
            .test("testFib", ok),
    );
    assert_eq!(
        candidates(&catalog, "pkg.Fib"),
        ids(&["pkg.Fib::testFib[0]", "pkg.Fib::testFib[1]", "pkg.Fib::testFib[2]"])
    );
}

#[test]
fn legacy_container_cases_follow_the_naming_convention() {
    let catalog = Catalog::new().with(
        ContainerBuilder::legacy("pkg.OldStyle")
            .case(MethodInfo::new("testOne"), ok)
            .case(MethodInfo::new("testTwo"), ok)
            .method(MethodInfo::new("setUp")),
    );
    assert_eq!(
        candidates(&catalog, "pkg.OldStyle"),
        ids(&["pkg.OldStyle::testOne", "pkg.OldStyle::testTwo"])
    );
}

#[test]
fn legacy_base_is_found_through_intermediate_supertypes() {
    let catalog = Catalog::new()
        .with_type(
            ContainerInfo::new("pkg.BaseCase")
                .with_modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
                .extends("junit.framework.TestCase"),
        )
        .with(
            ContainerBuilder::new("pkg.Derived")
                .extends("pkg.BaseCase")
                .case(MethodInfo::new("testInherited"), ok),
        );
    assert_eq!(candidates(&catalog, "pkg.Derived"), ids(&["pkg.Derived::testInherited"]));
}

#[test]
fn empty_legacy_container_never_emits_the_warning_case() {
    let catalog = Catalog::new().with(ContainerBuilder::legacy("pkg.Empty").method(MethodInfo::new("helper")));
    let found = candidates(&catalog, "pkg.Empty");
    assert!(found.iter().all(|id| id.case() != "warning"), "{found:?}");
    assert!(found.is_empty());
}

#[test]
fn unknown_supertype_counts_as_not_derived() {
    let catalog =
        Catalog::new().with(ContainerBuilder::new("pkg.Orphan").extends("pkg.Missing").method(MethodInfo::new("testA")));
    assert!(candidates(&catalog, "pkg.Orphan").is_empty());
}

// ========================================
// Selection
// ========================================

fn two_containers() -> Catalog {
    Catalog::new()
        .with(ContainerBuilder::new("pkg.Foo").test("testA", ok).test("testB", ok))
        .with(ContainerBuilder::new("pkg.Slow").test("testBig", ok))
}

fn find(catalog: &Catalog, selection: &Selection) -> (Vec<TestIdentifier>, String) {
    let mut out = Vec::new();
    let found = driver::find_tests(catalog, Path::new("."), selection, &mut out).unwrap();
    (found, String::from_utf8(out).unwrap())
}

#[test]
fn filter_applies_include_then_exclude() {
    let filter = CaseFilter::including(PatternSet::parse_list("pkg.*").unwrap())
        .excluding(PatternSet::parse_list("*::testB").unwrap());
    let (found, written) = find(&two_containers(), &Selection::Filter(filter));

    assert_eq!(found, ids(&["pkg.Foo::testA", "pkg.Slow::testBig"]));
    insta::assert_snapshot!(written, @r"
    pkg.Foo::testA
    pkg.Slow::testBig
    ");
}

#[test]
fn per_pattern_selection_keeps_duplicates() {
    let selection = Selection::PerPattern {
        patterns: PatternSet::parse_list("pkg.Foo::testA,pkg.Foo::*").unwrap(),
        exclude: PatternSet::empty(),
    };
    let (found, _) = find(&two_containers(), &selection);
    assert_eq!(found, ids(&["pkg.Foo::testA", "pkg.Foo::testA", "pkg.Foo::testB"]));
}

#[test]
fn find_command_writes_the_output_file() {
    use isorun::cli::commands::{self, FindArgs};
    use isorun::cli::ExitCode;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("found.lst");
    let exclude = dir.path().join("exclude.lst");
    fs::write(&exclude, "pkg.Slow::*\n").unwrap();

    let code = commands::find(
        &two_containers(),
        FindArgs {
            output: output.clone(),
            root: dir.path().to_path_buf(),
            exclude_file: Some(exclude),
            ..FindArgs::default()
        },
    )
    .unwrap();

    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(fs::read_to_string(output).unwrap(), "pkg.Foo::testA\npkg.Foo::testB\n");
}

#[test]
fn find_command_rejects_a_missing_root() {
    use isorun::cli::commands::{self, FindArgs};
    use isorun::cli::ExitCode;

    let dir = tempfile::tempdir().unwrap();
    let err = commands::find(
        &two_containers(),
        FindArgs {
            output: dir.path().join("found.lst"),
            root: dir.path().join("absent"),
            ..FindArgs::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.exit_code, ExitCode::USAGE);
}
