//! Handles all user-facing output for the CLI.
//!
//! Text reports are colourised through `termcolor`; JSON reports are the serialized
//! [`RunReport`]. Writers are generic so reports can be rendered into buffers in tests.

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::suite::{FixtureOutcome, FixtureReport, RunReport, SuiteReport};

/// Colour when stdout is a terminal.
pub fn stdout_stream() -> StandardStream {
    let choice = if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Renders the whole run as text.
pub fn write_run_report<W: WriteColor>(
    out: &mut W,
    report: &RunReport,
    show_passed: bool,
) -> io::Result<()> {
    for suite in &report.suites {
        write_suite_report(out, suite, show_passed)?;
    }
    if report.suites.len() > 1 {
        let (passed, failed, errored, skipped) = report.totals();
        writeln!(out)?;
        write!(out, "Total: ")?;
        write_counts(out, passed, failed, errored, skipped)?;
    }
    Ok(())
}

pub fn write_suite_report<W: WriteColor>(
    out: &mut W,
    suite: &SuiteReport,
    show_passed: bool,
) -> io::Result<()> {
    writeln!(out, "====== Suite: {} ======", suite.name)?;
    for fixture in &suite.fixtures {
        write_fixture(out, fixture, show_passed)?;
    }
    if suite.is_successful() && suite.skipped == 0 {
        write!(out, "All ")?;
        colored(out, Color::Green, &suite.passed.to_string())?;
        writeln!(out, " tests passed!")?;
        return Ok(());
    }
    write_counts(out, suite.passed, suite.failed, suite.errored, suite.skipped)
}

fn write_fixture<W: WriteColor>(
    out: &mut W,
    fixture: &FixtureReport,
    show_passed: bool,
) -> io::Result<()> {
    let path = fixture.path.display();
    match &fixture.outcome {
        FixtureOutcome::Passed if show_passed => {
            colored(out, Color::Green, "PASS")?;
            writeln!(out, ": {}", path)
        }
        FixtureOutcome::Passed => Ok(()),
        FixtureOutcome::Failed { failures } => {
            colored(out, Color::Red, "FAIL")?;
            writeln!(out, ": {}", path)?;
            for line in failures.iter().flat_map(|f| f.lines()) {
                colored(out, Color::Red, &format!("  {}", line))?;
                writeln!(out)?;
            }
            writeln!(out)
        }
        FixtureOutcome::Error { kind, message } => {
            colored(out, Color::Magenta, "ERROR")?;
            writeln!(out, ": {}", path)?;
            writeln!(out, "  {}: {}", kind, message)?;
            writeln!(out)
        }
        FixtureOutcome::Skipped { reason } if show_passed => {
            colored(out, Color::Yellow, "SKIP")?;
            writeln!(out, ": {} ({})", path, reason)
        }
        FixtureOutcome::Skipped { .. } => Ok(()),
    }
}

fn write_counts<W: WriteColor>(
    out: &mut W,
    passed: usize,
    failed: usize,
    errored: usize,
    skipped: usize,
) -> io::Result<()> {
    colored(out, Color::Green, &passed.to_string())?;
    write!(out, " tests passed. ")?;
    colored(out, Color::Red, &failed.to_string())?;
    write!(out, " tests failed")?;
    if errored > 0 {
        write!(out, ", ")?;
        colored(out, Color::Magenta, &errored.to_string())?;
        write!(out, " errored")?;
    }
    if skipped > 0 {
        write!(out, ", ")?;
        colored(out, Color::Yellow, &skipped.to_string())?;
        write!(out, " skipped")?;
    }
    writeln!(out)
}

fn colored<W: WriteColor>(out: &mut W, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(out, "{}", text)?;
    out.reset()
}

/// Writes the run report as pretty-printed JSON.
pub fn write_json<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}
