//! Validator: compares captured interpreter output against an [`ExpectationSet`].
//!
//! Three checks run in a fixed order and never short-circuit, so one bad run can report
//! several distinct problems:
//!
//! 1. stderr, either as a runtime error plus stack trace or as a set of compile errors
//! 2. the exit code
//! 3. stdout, line by line and positionally
//!
//! [`validate`] concatenates their failures in that order. An empty list is a pass.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::expectation::{format_error, ExpectationSet};
use crate::patterns::{STACK_TRACE, SYNTAX_ERROR};
use crate::runner::CapturedOutput;

/// Most raw output lines a single check reports before collapsing the rest.
pub const MAX_REPORTED_LINES: usize = 10;

/// One discrepancy between expected and actual behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub message: String,
    /// Raw process output attached for context.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = lines.into_iter().map(Into::into).collect();
        self
    }

    /// The interpreter did not finish within its time budget.
    pub fn timed_out(after: Duration, stderr: &str) -> Self {
        let mut lines = split_lines(stderr);
        strip_trailing_blank(&mut lines);
        Failure::new(format!(
            "Timed out after {:.1}s. Stderr:",
            after.as_secs_f64()
        ))
        .with_context(truncated(&lines))
    }

    /// Headline followed by context, one entry per report line.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.message.as_str()).chain(self.context.iter().map(String::as_str))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for line in &self.context {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

/// Runs every check and returns the failures in discovery order.
pub fn validate(expectations: &ExpectationSet, output: &CapturedOutput) -> Vec<Failure> {
    let mut failures = Vec::new();
    let stderr = split_lines(&output.stderr);
    let stdout = split_lines(&output.stdout);

    match &expectations.expected_runtime_error {
        Some(runtime) => validate_runtime_error(&runtime.message, &stderr, &mut failures),
        None => validate_compile_errors(&expectations.expected_errors, &stderr, &mut failures),
    }
    validate_exit_code(
        expectations.expected_exit_code,
        output.exit_code,
        &stderr,
        &mut failures,
    );
    validate_output(expectations, &stdout, &mut failures);

    failures
}

fn validate_runtime_error(expected: &str, lines: &[&str], failures: &mut Vec<Failure>) {
    if lines.len() < 2 {
        failures.push(Failure::new(format!(
            "Expected runtime error '{}' but got none",
            expected
        )));
        return;
    }

    let mut lines = lines.to_vec();
    strip_trailing_blank(&mut lines);

    if lines[0] != expected {
        failures.push(
            Failure::new(format!("Expected runtime error '{}' and got:", expected))
                .with_context([lines[0]]),
        );
    }

    let stack = &lines[1..];
    if !stack.iter().any(|line| STACK_TRACE.is_match(line)) {
        failures.push(Failure::new("Expected stack trace and got:").with_context(truncated(stack)));
    }
}

fn validate_compile_errors(expected: &[String], lines: &[&str], failures: &mut Vec<Failure>) {
    let mut lines = lines.to_vec();
    strip_trailing_blank(&mut lines);

    let mut found = HashSet::new();
    let mut unexpected = 0usize;

    for line in lines {
        let is_expected = match SYNTAX_ERROR.captures(line) {
            Some(caps) => {
                let error = format_error(&caps[1], &caps[2]);
                let known = expected.contains(&error);
                if known {
                    found.insert(error);
                }
                known
            }
            None => line.is_empty(),
        };
        if is_expected {
            continue;
        }
        if unexpected < MAX_REPORTED_LINES {
            failures.push(Failure::new("Unexpected output on stderr:").with_context([line]));
        }
        unexpected += 1;
    }

    if unexpected > MAX_REPORTED_LINES {
        failures.push(Failure::new(format!(
            "(truncated {} more...)",
            unexpected - MAX_REPORTED_LINES
        )));
    }

    for error in expected.iter().filter(|e| !found.contains(*e)) {
        failures.push(Failure::new(format!("Missing expected error: {}", error)));
    }
}

fn validate_exit_code(expected: i32, actual: i32, stderr: &[&str], failures: &mut Vec<Failure>) {
    if expected == actual {
        return;
    }
    let mut lines = stderr.to_vec();
    strip_trailing_blank(&mut lines);
    failures.push(
        Failure::new(format!(
            "Expected return code {} and got {}. Stderr:",
            expected, actual
        ))
        .with_context(truncated(&lines)),
    );
}

fn validate_output(expectations: &ExpectationSet, lines: &[&str], failures: &mut Vec<Failure>) {
    let mut lines = lines.to_vec();
    strip_trailing_blank(&mut lines);

    for (index, line) in lines.into_iter().enumerate() {
        match expectations.expected_output.get(index) {
            None => failures.push(Failure::new(format!(
                "Got output '{}' when none was expected",
                line
            ))),
            Some(expected) if expected.text != line => failures.push(Failure::new(format!(
                "Expected output '{}' on line {} and got '{}'",
                expected.text, expected.line, line
            ))),
            Some(_) => {}
        }
    }
}

/// Splits on `\n` and strips trailing carriage returns from every line.
fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect()
}

fn strip_trailing_blank(lines: &mut Vec<&str>) {
    if lines.last() == Some(&"") {
        lines.pop();
    }
}

/// First [`MAX_REPORTED_LINES`] lines, plus a marker when more were dropped.
fn truncated(lines: &[&str]) -> Vec<String> {
    let mut shown: Vec<String> = lines
        .iter()
        .take(MAX_REPORTED_LINES)
        .map(|line| line.to_string())
        .collect();
    if lines.len() > MAX_REPORTED_LINES {
        shown.push(format!(
            "(truncated {} more...)",
            lines.len() - MAX_REPORTED_LINES
        ));
    }
    shown
}
