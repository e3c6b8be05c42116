//! Well-known names shared by discovery, execution and reporting.
//!
//! The container/method vocabulary follows the two test conventions that are supported: the legacy one
//! (inherit from a base type, name methods `test...`) and the modern one (mark methods with an annotation).

// ============================================================================
// Identifiers and line formats
// ============================================================================

/// Separator between the container and the case in a rendered identifier (`pkg.Foo::testA`).
pub const CASE_SEPARATOR: &str = "::";

/// Prefix of the first line of every block in the failing-tests stream.
pub const FAILURE_PREFIX: &str = "--- ";

/// Separator between an identifier and its unit list in the loaded-units dump.
pub const LOADED_UNITS_MARKER: char = '#';

/// Delimiter between unit names in the loaded-units dump.
pub const LOADED_UNITS_DELIMITER: char = ',';

/// Delimiter between columns of the tabular results stream.
pub const TABULAR_DELIMITER: char = ',';

/// Status column value for a passing case.
pub const STATUS_PASS: &str = "pass";

/// Status column value for a failing case.
pub const STATUS_FAIL: &str = "fail";

/// Failing-tests marker for a failure that cannot be attributed to a well-formed identifier.
pub const BROKEN_TEST_INPUT: &str = "broken test input";

// ============================================================================
// Test conventions
// ============================================================================

/// Inheritance root of legacy test containers.
pub const LEGACY_BASE_TYPE: &str = "junit.framework.TestCase";

/// Marker annotation of a modern test method.
pub const TEST_MARKER: &str = "org.junit.Test";

/// Marker annotation of a modern theory method.
pub const THEORY_MARKER: &str = "org.junit.experimental.theories.Theory";

/// Synthetic type the legacy framework uses to report container-level problems.
pub const LEGACY_SUITE_FAILURE_TYPE: &str = "junit.framework.TestSuite$1";

/// Method the legacy framework reports on [`LEGACY_SUITE_FAILURE_TYPE`]; never a real test.
pub const LEGACY_WARNING_METHOD: &str = "warning";

/// Method name the modern framework reports when a container cannot be initialized.
pub const INITIALIZATION_ERROR_METHOD: &str = "initializationError";

/// Stack frame present when a failure happened while constructing the container instance.
pub const CREATE_TEST_FRAME: &str = "createTest";

/// Name prefixes (both casings) of a legacy-style test method.
pub const TEST_NAME_AFFIXES: &[&str] = &["test", "Test"];

/// Name prefixes that always resolve through the ambient context (framework, assertions, coverage).
pub const DEFAULT_SHARED_PREFIXES: &[&str] = &["junit.", "org.junit.", "org.hamcrest.", "org.jacoco."];

/// Extension of compiled artifacts on disk.
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "class";

// ============================================================================
// Output files
// ============================================================================

/// Default file of the all-tests stream.
pub const DEFAULT_ALL_TESTS_FILE: &str = "all_tests";

/// Default file of the failing-tests stream.
pub const DEFAULT_FAILING_TESTS_FILE: &str = "failing-tests.txt";

/// Default file of the tabular results stream.
pub const DEFAULT_TIMING_FILE: &str = "tests.txt";

/// Default file of the loaded-units dump.
pub const DEFAULT_LOADED_UNITS_FILE: &str = "loaded-units.txt";

/// Check whether `name` starts or ends with one of the [`TEST_NAME_AFFIXES`].
pub fn has_test_affix(name: &str) -> bool {
    TEST_NAME_AFFIXES
        .iter()
        .any(|affix| name.starts_with(affix) || name.ends_with(affix))
}

/// Check whether a container name denotes a compiler-synthesized anonymous type (`Outer$1`).
pub fn is_anonymous_name(name: &str) -> bool {
    match name.rfind('$') {
        Some(pos) => name[pos + 1..].chars().next().is_some_and(|c| c.is_ascii_digit()),
        None => false,
    }
}
