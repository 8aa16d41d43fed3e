//! Directive parser: turns an annotated fixture into an [`ExpectationSet`].
//!
//! Directive kinds live in a declarative table of `(kind, pattern, handler)` entries. The
//! parsing loop tries each entry in priority order and stops at the first whose pattern
//! matches; adding a directive kind means adding a table row, not touching the loop.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::diagnostics::{HarnessError, Result};
use crate::expectation::{
    format_error, ExitCodes, ExpectationSet, ExpectedOutput, RuntimeErrorExpectation,
};
use crate::patterns::{
    ERROR_LINE, EXPECTED_ERROR, EXPECTED_OUTPUT, EXPECTED_RUNTIME_ERROR, NON_TEST,
};

/// Inputs that influence how directives are interpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    /// Implementation tag of the interpreter under test, e.g. `java` or `c`.
    pub language: Option<&'a str>,
    pub exit_codes: ExitCodes,
}

impl<'a> ParseOptions<'a> {
    pub fn new(language: Option<&'a str>, exit_codes: ExitCodes) -> Self {
        Self {
            language,
            exit_codes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Output,
    Error,
    ErrorLine,
    RuntimeError,
}

/// Mutable state threaded through the handlers for one fixture.
struct ParseState<'o> {
    set: ExpectationSet,
    line: usize,
    options: &'o ParseOptions<'o>,
}

/// A handler returns `true` when the directive applies to this run and should be counted.
type Handler = fn(&Captures<'_>, &mut ParseState<'_>) -> bool;

struct Directive {
    kind: DirectiveKind,
    pattern: &'static Regex,
    apply: Handler,
}

lazy_static! {
    static ref DIRECTIVES: [Directive; 4] = [
        Directive {
            kind: DirectiveKind::Output,
            pattern: &*EXPECTED_OUTPUT,
            apply: apply_output,
        },
        Directive {
            kind: DirectiveKind::Error,
            pattern: &*EXPECTED_ERROR,
            apply: apply_error,
        },
        Directive {
            kind: DirectiveKind::ErrorLine,
            pattern: &*ERROR_LINE,
            apply: apply_error_line,
        },
        Directive {
            kind: DirectiveKind::RuntimeError,
            pattern: &*EXPECTED_RUNTIME_ERROR,
            apply: apply_runtime_error,
        },
    ];
}

fn apply_output(caps: &Captures<'_>, state: &mut ParseState<'_>) -> bool {
    state.set.expected_output.push(ExpectedOutput {
        line: state.line,
        text: caps[1].to_string(),
    });
    true
}

fn apply_error(caps: &Captures<'_>, state: &mut ParseState<'_>) -> bool {
    state.set.add_error(format_error(state.line, &caps[1]));
    state.set.expected_exit_code = state.options.exit_codes.compile_error;
    true
}

fn apply_error_line(caps: &Captures<'_>, state: &mut ParseState<'_>) -> bool {
    if let Some(tag) = caps.get(1) {
        if state.options.language != Some(tag.as_str()) {
            return false;
        }
    }
    state.set.add_error(format_error(&caps[2], &caps[3]));
    state.set.expected_exit_code = state.options.exit_codes.compile_error;
    true
}

fn apply_runtime_error(caps: &Captures<'_>, state: &mut ParseState<'_>) -> bool {
    state.set.expected_runtime_error = Some(RuntimeErrorExpectation {
        line: state.line,
        message: caps[1].to_string(),
    });
    state.set.expected_exit_code = state.options.exit_codes.runtime_error;
    true
}

/// Reads and parses the fixture at `path`.
pub fn parse_file(path: &Path, options: &ParseOptions<'_>) -> Result<ExpectationSet> {
    let source = fs::read_to_string(path).map_err(|source| HarnessError::FixtureRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_source(path, &source, options)
}

/// Parses already-loaded fixture text. `path` is only used for error reporting.
pub fn parse_source(
    path: &Path,
    source: &str,
    options: &ParseOptions<'_>,
) -> Result<ExpectationSet> {
    let mut state = ParseState {
        set: ExpectationSet::new(),
        line: 0,
        options,
    };

    for (index, text) in source.lines().enumerate() {
        state.line = index + 1;

        if NON_TEST.is_match(text) {
            debug!(path = %path.display(), line = state.line, "non-test marker, stopping");
            break;
        }

        if let Some(kind) = apply_first_match(text, &mut state) {
            debug!(path = %path.display(), line = state.line, ?kind, "directive");
        }

        if state.set.is_conflicting() {
            return Err(HarnessError::parse(
                path,
                format!(
                    "line {} mixes a runtime error expectation with compile error expectations",
                    state.line
                ),
            ));
        }
    }

    Ok(state.set)
}

/// Applies the first directive whose pattern matches `text`; returns its kind if counted.
fn apply_first_match(text: &str, state: &mut ParseState<'_>) -> Option<DirectiveKind> {
    for directive in DIRECTIVES.iter() {
        let Some(caps) = directive.pattern.captures(text) else {
            continue;
        };
        if (directive.apply)(&caps, state) {
            state.set.expectation_count += 1;
            return Some(directive.kind);
        }
        return None;
    }
    None
}
