//! Harness-fatal errors.
//!
//! Everything in this module describes a broken test environment: an unreadable fixture,
//! a fixture whose directives contradict each other, an interpreter that could not be
//! started or that died without an exit code. Behavioural mismatches between a fixture and
//! the interpreter are never represented here; those are [`crate::validator::Failure`]s.
//!
//! Each variant carries a stable `miette` code so the CLI can render it with help text.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for every harness-fatal condition.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("failed to read fixture '{path}'")]
    #[diagnostic(code(loxtest::io), help("check that the fixture exists and is readable"))]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} failed to parse: {reason}")]
    #[diagnostic(
        code(loxtest::parse),
        help("a fixture may expect compile errors or a runtime error, never both")
    )]
    Parse { path: PathBuf, reason: String },

    #[error("failed to start interpreter '{executable}'")]
    #[diagnostic(
        code(loxtest::process::spawn),
        help("pass --interpreter or set `executable` in the suite configuration")
    )]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("interpreter was terminated by signal {signal} while running '{path}'")]
    #[diagnostic(code(loxtest::process::signal))]
    Signaled { path: PathBuf, signal: i32 },

    #[error("interpreter exit status for '{path}' carried no exit code")]
    #[diagnostic(code(loxtest::process::status))]
    UnknownStatus { path: PathBuf },

    #[error("failed to wait for interpreter on '{path}'")]
    #[diagnostic(code(loxtest::process::wait))]
    Wait {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk fixture directory '{root}'")]
    #[diagnostic(code(loxtest::discovery))]
    Discovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to list directory '{root}'")]
    #[diagnostic(code(loxtest::discovery::read_dir))]
    ReadDir {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(loxtest::config))]
    Config { message: String },

    #[error("failed to load configuration '{path}'")]
    #[diagnostic(code(loxtest::config::load))]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("failed to write output")]
    #[diagnostic(code(loxtest::output))]
    Output(#[source] std::io::Error),

    #[error("failed to build worker pool")]
    #[diagnostic(code(loxtest::pool))]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl HarnessError {
    /// Short category label used by the reporters.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::FixtureRead { .. } | HarnessError::Output(_) => "io",
            HarnessError::Parse { .. } => "parse",
            HarnessError::Spawn { .. }
            | HarnessError::Signaled { .. }
            | HarnessError::UnknownStatus { .. }
            | HarnessError::Wait { .. } => "process",
            HarnessError::Discovery { .. } | HarnessError::ReadDir { .. } => "discovery",
            HarnessError::Config { .. } | HarnessError::ConfigLoad { .. } => "config",
            HarnessError::Pool(_) => "pool",
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        HarnessError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        HarnessError::Config {
            message: message.into(),
        }
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_fixture_path() {
        let err = HarnessError::parse("tests/bad.lox", "conflicting expectations");
        assert_eq!(
            err.to_string(),
            "tests/bad.lox failed to parse: conflicting expectations"
        );
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn diagnostic_codes_are_stable() {
        let err = HarnessError::config("jobs must be positive");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("loxtest::config"));
    }
}
