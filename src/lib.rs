//! A directive-driven conformance harness for Lox interpreters.
//!
//! Fixtures are Lox sources annotated with comment directives (`// expect: ...`,
//! `// Error ...`, `// expect runtime error: ...`). The harness parses those directives
//! into an [`expectation::ExpectationSet`], runs the fixture through an external
//! interpreter, and validates stdout, stderr and the exit code against it.

pub use crate::diagnostics::{HarnessError, Result};

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod expectation;
pub mod parser;
pub mod patterns;
pub mod runner;
pub mod suite;
pub mod validator;

/// Initialise the tracing subscriber for logging.
///
/// `RUST_LOG` wins when set; otherwise each `-v` raises the level from `warn`.
pub fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("loxtest={level}")));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init();
}
