//! End-to-end runs of the parser, runner and validator through `SuiteRunner`.
#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{shell, write_fixture, COMPILE_ERROR, HELLO, RUNTIME_ERROR};
use loxtest::config::{HarnessConfig, SuiteConfig};
use loxtest::expectation::ExitCodes;
use loxtest::suite::{FixtureOutcome, Suite, SuiteRunner};

fn runner() -> SuiteRunner {
    SuiteRunner::new(2, ExitCodes::default()).unwrap()
}

#[test]
fn well_behaved_fixtures_all_pass() {
    let dir = tempfile::tempdir().unwrap();
    let fixtures = vec![
        write_fixture(dir.path(), "hello.lox", HELLO),
        write_fixture(dir.path(), "runtime.lox", RUNTIME_ERROR),
        write_fixture(dir.path(), "compile.lox", COMPILE_ERROR),
        write_fixture(dir.path(), "silent.lox", "true\n"),
        write_fixture(
            dir.path(),
            "nontest.lox",
            "echo one # // expect: one\nexit 0 # // nontest\n# // expect: never\n",
        ),
    ];
    let suite = Suite::new("shell", shell()).with_fixtures(fixtures);

    let report = runner().run_suite(&suite);
    let failed: Vec<_> = report
        .fixtures
        .iter()
        .filter(|f| f.outcome != FixtureOutcome::Passed)
        .collect();
    assert!(failed.is_empty(), "unexpected failures: {failed:#?}");
    assert_eq!(report.passed, 5);
    assert!(report.is_successful());
}

#[test]
fn extra_output_is_a_single_failure() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        dir.path(),
        "extra.lox",
        "echo Hello # // expect: Hello\necho Extra\n",
    );
    let suite = Suite::new("shell", shell()).with_fixtures(vec![fixture]);

    let report = runner().run_suite(&suite);
    match &report.fixtures[0].outcome {
        FixtureOutcome::Failed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].message, "Got output 'Extra' when none was expected");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(report.failed, 1);
}

#[test]
fn runtime_error_with_wrong_exit_code_reports_only_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        dir.path(),
        "wrong_code.lox",
        &RUNTIME_ERROR.replace("exit 70", "exit 1"),
    );
    let suite = Suite::new("shell", shell()).with_fixtures(vec![fixture]);

    let report = runner().run_suite(&suite);
    let FixtureOutcome::Failed { failures } = &report.fixtures[0].outcome else {
        panic!("expected failure");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message, "Expected return code 70 and got 1. Stderr:");
}

#[test]
fn conflicting_fixture_is_an_error_not_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let body = format!(
        "touch {} # // Error: a.\n# // expect runtime error: b.\n",
        marker.display()
    );
    let fixture = write_fixture(dir.path(), "conflict.lox", &body);
    let suite = Suite::new("shell", shell()).with_fixtures(vec![fixture]);

    let report = runner().run_suite(&suite);
    assert!(matches!(
        &report.fixtures[0].outcome,
        FixtureOutcome::Error { kind, .. } if kind == "parse"
    ));
    assert_eq!(report.errored, 1);
    assert!(!report.is_successful());
    assert!(!marker.exists(), "interpreter must not run for a malformed fixture");
}

#[test]
fn hung_interpreter_gets_a_timeout_failure() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), "hang.lox", "exec sleep 5\n");
    let interpreter = shell().with_timeout(Some(Duration::from_millis(300)));
    let suite = Suite::new("shell", interpreter).with_fixtures(vec![fixture]);

    let report = runner().run_suite(&suite);
    let FixtureOutcome::Failed { failures } = &report.fixtures[0].outcome else {
        panic!("expected timeout failure");
    };
    assert!(failures[0].message.starts_with("Timed out after 0.3s"));
}

#[test]
fn timeout_reaches_processes_a_launcher_left_running() {
    let dir = tempfile::tempdir().unwrap();
    // A wrapper that forks its interpreter instead of exec-ing it.
    let fixture = write_fixture(dir.path(), "launcher.lox", "sleep 4\ntrue\n");
    let interpreter = shell().with_timeout(Some(Duration::from_millis(200)));
    let suite = Suite::new("shell", interpreter).with_fixtures(vec![fixture]);

    let start = Instant::now();
    let report = runner().run_suite(&suite);
    assert!(start.elapsed() < Duration::from_secs(2));
    let FixtureOutcome::Failed { failures } = &report.fixtures[0].outcome else {
        panic!("expected timeout failure");
    };
    assert!(failures[0].message.starts_with("Timed out after 0.2s"));
}

#[test]
fn language_tag_selects_expected_errors() {
    let dir = tempfile::tempdir().unwrap();
    let body = "\
echo '[line 3] Error at end: Expect expression.' >&2
exit 65
# // [java line 3] Error at end: Expect expression.
# // [c line 3] Error at end: Expect expression after '='.
";
    let fixture = write_fixture(dir.path(), "tagged.lox", body);

    let java = Suite::new("java", shell())
        .with_language(Some("java".into()))
        .with_fixtures(vec![fixture.clone()]);
    assert!(runner().run_suite(&java).is_successful());

    let c = Suite::new("c", shell())
        .with_language(Some("c".into()))
        .with_fixtures(vec![fixture]);
    let report = runner().run_suite(&c);
    let FixtureOutcome::Failed { failures } = &report.fixtures[0].outcome else {
        panic!("expected failure for c");
    };
    let messages: Vec<_> = failures.iter().map(|f| f.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Unexpected output on stderr:",
            "Missing expected error: [3] Error at end: Expect expression after '='.",
        ]
    );
}

#[test]
fn per_directory_config_expands_suites_and_skips_benchmarks() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "assignment/hello.lox", HELLO);
    write_fixture(dir.path(), "closure/runtime.lox", RUNTIME_ERROR);
    write_fixture(dir.path(), "benchmark/fib.lox", "exit 3\n");

    let config = HarnessConfig {
        suites: vec![SuiteConfig {
            name: "sh".into(),
            executable: "sh".into(),
            args: vec!["{fixture}".into()],
            language: None,
            root: dir.path().to_path_buf(),
            per_directory: true,
        }],
        ..HarnessConfig::default()
    };
    let suites = loxtest::suite::suites_from_config(&config).unwrap();
    let names: Vec<_> = suites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["sh - assignment", "sh - benchmark", "sh - closure"]);

    let report = runner().run_all(&suites);
    assert!(report.is_successful());
    assert_eq!(report.totals(), (2, 0, 0, 1));
}
