//! The loxtest Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::io::{self, Write};
use std::path::Path;
use std::process;

use clap::Parser;
use tracing::info;

use crate::cli::args::{Command, LoxtestArgs, ReportFormat, RunArgs, SourceArgs};
use crate::config::{HarnessConfig, SuiteConfig, DEFAULT_FIXTURE_ROOT};
use crate::diagnostics::{HarnessError, Result};
use crate::expectation::ExpectationSet;
use crate::parser::{parse_file, ParseOptions};
use crate::suite::{suites_from_config, Suite, SuiteRunner};

pub mod args;
pub mod output;

/// Exit status when every fixture passed.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status when at least one fixture failed or errored.
pub const EXIT_FAILURES: i32 = 1;
/// Exit status when the harness itself could not run.
pub const EXIT_HARNESS_ERROR: i32 = 2;

/// The main entry point for the CLI.
pub fn run() {
    let args = LoxtestArgs::parse();
    crate::init_tracing(args.verbose);

    let result = match args.command {
        Command::Run(run) => handle_run(&run, args.verbose > 0),
        Command::Parse {
            fixture,
            language,
            config,
        } => handle_parse(&fixture, language.as_deref(), config.as_deref()),
        Command::List(source) => handle_list(&source),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(EXIT_HARNESS_ERROR);
        }
    }
}

/// Merges the config file with command-line overrides.
pub fn resolve_config(source: &SourceArgs) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::discover(source.config.as_deref())?;

    if let Some(executable) = &source.interpreter {
        config.suites = vec![SuiteConfig {
            name: source
                .language
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            executable: executable.clone(),
            args: source.args.clone(),
            language: source.language.clone(),
            root: source
                .root
                .clone()
                .unwrap_or_else(|| DEFAULT_FIXTURE_ROOT.into()),
            per_directory: source.per_directory,
        }];
    } else if let Some(root) = &source.root {
        for suite in &mut config.suites {
            suite.root = root.clone();
        }
    }

    config.validate()?;
    Ok(config)
}

/// Expands the configured suites and applies `--suite` filters.
pub fn select_suites(config: &HarnessConfig, filters: &[String]) -> Result<Vec<Suite>> {
    if config.suites.is_empty() {
        return Err(HarnessError::config(
            "no suites configured; pass --interpreter or add suites to loxtest.yaml",
        ));
    }
    let mut suites = suites_from_config(config)?;
    if !filters.is_empty() {
        suites.retain(|suite| filters.iter().any(|f| suite.matches(f)));
        if suites.is_empty() {
            return Err(HarnessError::config(format!(
                "no suite matches {}",
                filters.join(", ")
            )));
        }
    }
    Ok(suites)
}

/// Handles the `run` subcommand.
fn handle_run(args: &RunArgs, verbose: bool) -> Result<i32> {
    let mut config = resolve_config(&args.source)?;
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    let suites = select_suites(&config, &args.source.suites)?;
    let runner = SuiteRunner::new(config.jobs, config.exit_codes)?;
    info!(suites = suites.len(), threads = runner.threads(), "starting run");
    let report = runner.run_all(&suites);

    let written = match args.format {
        ReportFormat::Text => {
            let mut out = output::stdout_stream();
            output::write_run_report(&mut out, &report, verbose)
        }
        ReportFormat::Json => output::write_json(&mut io::stdout().lock(), &report),
    };
    // A closed stdout must not turn a failing run into a passing one.
    if let Err(e) = written {
        tracing::warn!(error = %e, "failed to write report");
    }

    Ok(if report.is_successful() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURES
    })
}

/// Handles the `parse` subcommand.
fn handle_parse(fixture: &Path, language: Option<&str>, config: Option<&Path>) -> Result<i32> {
    let config = HarnessConfig::discover(config)?;
    let options = ParseOptions::new(language, config.exit_codes);
    let expectations = parse_file(fixture, &options)?;
    write_expectations(&mut io::stdout().lock(), &expectations).map_err(HarnessError::Output)?;
    Ok(EXIT_SUCCESS)
}

/// Handles the `list` subcommand.
fn handle_list(source: &SourceArgs) -> Result<i32> {
    let config = resolve_config(source)?;
    let suites = select_suites(&config, &source.suites)?;
    write_suite_list(&mut io::stdout().lock(), &suites).map_err(HarnessError::Output)?;
    Ok(EXIT_SUCCESS)
}

fn write_expectations<W: Write>(out: &mut W, expectations: &ExpectationSet) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, expectations)?;
    writeln!(out)
}

fn write_suite_list<W: Write>(out: &mut W, suites: &[Suite]) -> io::Result<()> {
    for suite in suites {
        writeln!(
            out,
            "{}: {} fixtures ({} excluded)",
            suite.name,
            suite.fixtures.len(),
            suite.excluded.len()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpreter_flag_replaces_configured_suites() {
        let source = SourceArgs {
            interpreter: Some("clox".into()),
            language: Some("c".into()),
            root: Some("fixtures".into()),
            ..SourceArgs::default()
        };
        let config = resolve_config(&source).unwrap();
        assert_eq!(config.suites.len(), 1);
        let suite = &config.suites[0];
        assert_eq!(suite.name, "c");
        assert_eq!(suite.executable, "clox");
        assert_eq!(suite.language.as_deref(), Some("c"));
        assert_eq!(suite.root, Path::new("fixtures"));
    }

    #[test]
    fn no_suites_is_a_config_error() {
        let err = select_suites(&HarnessConfig::default(), &[]).unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
    }

    /// A writer whose every write fails, like a closed pipe.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn parse_and_list_output_errors_propagate() {
        assert!(write_expectations(&mut ClosedPipe, &ExpectationSet::default()).is_err());
        let suite = Suite::new("c", crate::runner::Interpreter::new("clox"));
        assert!(write_suite_list(&mut ClosedPipe, &[suite]).is_err());

        let mut out = Vec::new();
        write_expectations(&mut out, &ExpectationSet::default()).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\"expected_exit_code\": 0"));
    }

    #[test]
    fn output_error_is_harness_fatal() {
        let err = HarnessError::Output(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(err.kind(), "io");
        assert_eq!(err.to_string(), "failed to write output");
    }
}
