//! The expectation set extracted from one fixture.

use serde::{Deserialize, Serialize};

/// Exit code an interpreter uses for a clean run.
pub const SUCCESS_EXIT_CODE: i32 = 0;
/// Default exit code for compile (static) errors.
pub const DEFAULT_COMPILE_ERROR_CODE: i32 = 65;
/// Default exit code for runtime errors.
pub const DEFAULT_RUNTIME_ERROR_CODE: i32 = 70;

/// The two non-zero exit codes an interpreter under test is contracted to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitCodes {
    pub compile_error: i32,
    pub runtime_error: i32,
}

impl Default for ExitCodes {
    fn default() -> Self {
        Self {
            compile_error: DEFAULT_COMPILE_ERROR_CODE,
            runtime_error: DEFAULT_RUNTIME_ERROR_CODE,
        }
    }
}

/// One stdout line the interpreter must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedOutput {
    /// Fixture line holding the directive.
    pub line: usize,
    pub text: String,
}

/// The expected first line of stderr for a runtime failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeErrorExpectation {
    pub line: usize,
    pub message: String,
}

/// Everything a fixture expects of the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationSet {
    pub expected_output: Vec<ExpectedOutput>,
    /// `[<line>] <message>` strings. Set semantics, declaration order kept for reporting.
    pub expected_errors: Vec<String>,
    pub expected_runtime_error: Option<RuntimeErrorExpectation>,
    pub expected_exit_code: i32,
    pub expectation_count: usize,
}

impl Default for ExpectationSet {
    fn default() -> Self {
        Self {
            expected_output: Vec::new(),
            expected_errors: Vec::new(),
            expected_runtime_error: None,
            expected_exit_code: SUCCESS_EXIT_CODE,
            expectation_count: 0,
        }
    }
}

impl ExpectationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a compile error, ignoring exact duplicates.
    pub fn add_error(&mut self, error: String) {
        if !self.expected_errors.contains(&error) {
            self.expected_errors.push(error);
        }
    }

    pub fn expects_runtime_error(&self) -> bool {
        self.expected_runtime_error.is_some()
    }

    /// True when runtime and compile expectations are both present.
    pub fn is_conflicting(&self) -> bool {
        self.expects_runtime_error() && !self.expected_errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.expectation_count == 0
    }
}

/// Formats a compile error the way both directives and interpreter diagnostics are compared.
pub fn format_error(line: impl std::fmt::Display, message: &str) -> String {
    format!("[{}] {}", line, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_errors_are_stored_once() {
        let mut set = ExpectationSet::new();
        set.add_error(format_error(2, "Error: a"));
        set.add_error(format_error(2, "Error: a"));
        set.add_error(format_error(3, "Error: a"));
        assert_eq!(set.expected_errors, vec!["[2] Error: a", "[3] Error: a"]);
    }

    #[test]
    fn default_set_expects_clean_exit() {
        let set = ExpectationSet::default();
        assert_eq!(set.expected_exit_code, 0);
        assert!(set.is_empty());
        assert!(!set.is_conflicting());
    }
}
