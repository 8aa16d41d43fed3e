//! Suite orchestration.
//!
//! A [`Suite`] pairs one interpreter configuration with a list of fixtures. The
//! [`SuiteRunner`] runs fixtures on a bounded worker pool; every task yields a
//! [`FixtureReport`] and the per-suite tallies are computed once, from the collected
//! results, in [`SuiteReport::from_fixtures`]. Nothing is shared between workers.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::config::{HarnessConfig, SuiteConfig};
use crate::diagnostics::{HarnessError, Result};
use crate::discovery::{subdirectories, FixtureDiscoverer};
use crate::expectation::ExitCodes;
use crate::parser::{parse_file, ParseOptions};
use crate::runner::{Interpreter, RunOutcome};
use crate::validator::{validate, Failure};

/// A named collection of fixtures run against one interpreter configuration.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub interpreter: Interpreter,
    pub language: Option<String>,
    pub fixtures: Vec<PathBuf>,
    /// Discovered but excluded fixtures, reported as skipped.
    pub excluded: Vec<PathBuf>,
}

impl Suite {
    pub fn new(name: impl Into<String>, interpreter: Interpreter) -> Self {
        Self {
            name: name.into(),
            interpreter,
            language: None,
            fixtures: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_fixtures(mut self, fixtures: Vec<PathBuf>) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Expands a suite definition into concrete suites, discovering fixtures on disk.
    ///
    /// With `per_directory` set, every immediate subdirectory of the root becomes its own
    /// suite named `<name> - <dir>`.
    pub fn from_config(suite: &SuiteConfig, harness: &HarnessConfig) -> Result<Vec<Suite>> {
        let discoverer = FixtureDiscoverer::new(harness.extension.clone(), harness.exclude.clone());
        let interpreter = Interpreter::new(suite.executable.clone())
            .with_args(suite.args.iter().cloned())
            .with_timeout(harness.timeout());

        let roots: Vec<(String, PathBuf)> = if suite.per_directory {
            subdirectories(&suite.root)?
                .into_iter()
                .map(|dir| {
                    let label = dir
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (format!("{} - {}", suite.name, label), dir)
                })
                .collect()
        } else {
            vec![(suite.name.clone(), suite.root.clone())]
        };

        roots
            .into_iter()
            .map(|(name, root)| {
                let found = discoverer.discover(&root)?;
                Ok(Suite {
                    name,
                    interpreter: interpreter.clone(),
                    language: suite.language.clone(),
                    fixtures: found.fixtures,
                    excluded: found.excluded,
                })
            })
            .collect()
    }

    /// True if `filter` names this suite or the definition it was expanded from.
    pub fn matches(&self, filter: &str) -> bool {
        self.name == filter || self.name.starts_with(&format!("{} - ", filter))
    }
}

/// Expands every configured suite.
pub fn suites_from_config(config: &HarnessConfig) -> Result<Vec<Suite>> {
    let mut suites = Vec::new();
    for suite in &config.suites {
        suites.extend(Suite::from_config(suite, config)?);
    }
    Ok(suites)
}

/// What happened to one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FixtureOutcome {
    Passed,
    Failed { failures: Vec<Failure> },
    /// A harness-fatal error aborted this fixture.
    Error { kind: String, message: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FixtureOutcome,
}

impl FixtureReport {
    fn from_result(path: &Path, result: Result<Vec<Failure>>) -> Self {
        let outcome = match result {
            Ok(failures) if failures.is_empty() => FixtureOutcome::Passed,
            Ok(failures) => FixtureOutcome::Failed { failures },
            Err(err) => (&err).into(),
        };
        Self {
            path: path.to_path_buf(),
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub fixtures: Vec<FixtureReport>,
}

impl SuiteReport {
    /// Tallies the collected fixture reports.
    pub fn from_fixtures(name: impl Into<String>, fixtures: Vec<FixtureReport>) -> Self {
        let mut report = SuiteReport {
            name: name.into(),
            passed: 0,
            failed: 0,
            errored: 0,
            skipped: 0,
            fixtures: Vec::new(),
        };
        for fixture in &fixtures {
            match fixture.outcome {
                FixtureOutcome::Passed => report.passed += 1,
                FixtureOutcome::Failed { .. } => report.failed += 1,
                FixtureOutcome::Error { .. } => report.errored += 1,
                FixtureOutcome::Skipped { .. } => report.skipped += 1,
            }
        }
        report.fixtures = fixtures;
        report
    }

    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Results of every suite in one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    /// True iff no fixture failed or errored in any suite.
    pub fn is_successful(&self) -> bool {
        self.suites.iter().all(SuiteReport::is_successful)
    }

    pub fn totals(&self) -> (usize, usize, usize, usize) {
        self.suites.iter().fold((0, 0, 0, 0), |acc, s| {
            (
                acc.0 + s.passed,
                acc.1 + s.failed,
                acc.2 + s.errored,
                acc.3 + s.skipped,
            )
        })
    }
}

/// Runs suites on a bounded worker pool.
pub struct SuiteRunner {
    pool: rayon::ThreadPool,
    exit_codes: ExitCodes,
}

impl SuiteRunner {
    /// `jobs == 0` sizes the pool to the number of CPUs.
    pub fn new(jobs: usize, exit_codes: ExitCodes) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|index| format!("loxtest-worker-{index}"))
            .build()?;
        Ok(Self { pool, exit_codes })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn run_suite(&self, suite: &Suite) -> SuiteReport {
        let span = info_span!("suite", name = %suite.name);
        let _guard = span.enter();
        info!(
            fixtures = suite.fixtures.len(),
            threads = self.threads(),
            "running suite"
        );

        let mut reports: Vec<FixtureReport> = suite
            .excluded
            .iter()
            .map(|path| FixtureReport {
                path: path.clone(),
                outcome: FixtureOutcome::Skipped {
                    reason: "excluded".to_string(),
                },
            })
            .collect();

        let ran: Vec<FixtureReport> = self.pool.install(|| {
            suite
                .fixtures
                .par_iter()
                .map(|path| {
                    let result = run_fixture(suite, path, self.exit_codes);
                    FixtureReport::from_result(path, result)
                })
                .collect()
        });
        reports.extend(ran);

        let report = SuiteReport::from_fixtures(suite.name.clone(), reports);
        info!(
            passed = report.passed,
            failed = report.failed,
            errored = report.errored,
            skipped = report.skipped,
            "suite finished"
        );
        report
    }

    pub fn run_all(&self, suites: &[Suite]) -> RunReport {
        RunReport {
            suites: suites.iter().map(|suite| self.run_suite(suite)).collect(),
        }
    }
}

/// Parses, runs and validates one fixture.
///
/// A parse error is returned before any process is started.
pub fn run_fixture(suite: &Suite, path: &Path, exit_codes: ExitCodes) -> Result<Vec<Failure>> {
    debug!(fixture = %path.display(), "running fixture");
    let options = ParseOptions::new(suite.language.as_deref(), exit_codes);
    let expectations = parse_file(path, &options)?;
    if expectations.is_empty() {
        debug!(fixture = %path.display(), "no expectations; only a clean exit is checked");
    }

    let failures = match suite.interpreter.run(path)? {
        RunOutcome::Completed(output) => validate(&expectations, &output),
        RunOutcome::TimedOut { after, stderr, .. } => vec![Failure::timed_out(after, &stderr)],
    };
    if !failures.is_empty() {
        debug!(fixture = %path.display(), failures = failures.len(), "fixture failed");
    }
    Ok(failures)
}

impl From<&HarnessError> for FixtureOutcome {
    fn from(err: &HarnessError) -> Self {
        FixtureOutcome::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(path: &str, outcome: FixtureOutcome) -> FixtureReport {
        FixtureReport {
            path: PathBuf::from(path),
            outcome,
        }
    }

    #[test]
    fn tallies_are_computed_from_collected_reports() {
        let suite = SuiteReport::from_fixtures(
            "java - expressions",
            vec![
                report("a.lox", FixtureOutcome::Passed),
                report(
                    "b.lox",
                    FixtureOutcome::Failed {
                        failures: vec![Failure::new("x")],
                    },
                ),
                report(
                    "c.lox",
                    FixtureOutcome::Skipped {
                        reason: "excluded".into(),
                    },
                ),
                report("d.lox", FixtureOutcome::Passed),
            ],
        );
        assert_eq!((suite.passed, suite.failed, suite.errored, suite.skipped), (2, 1, 0, 1));
        assert!(!suite.is_successful());
    }

    #[test]
    fn errors_make_a_run_unsuccessful() {
        let err = HarnessError::parse("e.lox", "conflict");
        let suite = SuiteReport::from_fixtures("c", vec![report("e.lox", (&err).into())]);
        assert_eq!(suite.errored, 1);
        let run = RunReport {
            suites: vec![suite],
        };
        assert!(!run.is_successful());
        assert_eq!(run.totals(), (0, 0, 1, 0));
    }

    #[test]
    fn empty_run_is_successful() {
        assert!(RunReport::default().is_successful());
    }

    #[test]
    fn suite_filter_matches_expanded_names() {
        let suite = Suite::new("java - closure", Interpreter::new("java"));
        assert!(suite.matches("java"));
        assert!(suite.matches("java - closure"));
        assert!(!suite.matches("jav"));
        assert!(!suite.matches("c"));
    }

    #[test]
    fn conflicting_fixture_never_runs_the_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("bad.lox");
        std::fs::write(&fixture, "a; // Error: x.\nb; // expect runtime error: y.\n").unwrap();
        let suite = Suite::new("s", Interpreter::new("/no/such/interpreter"));
        let err = run_fixture(&suite, &fixture, ExitCodes::default()).unwrap_err();
        assert!(matches!(err, HarnessError::Parse { .. }));
    }
}
