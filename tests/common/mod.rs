//! Shared helpers for the integration tests.
//!
//! Fixtures here are shell scripts run by `sh`; their `#` comments carry the `//`
//! directives, so the script both declares and produces the expected behaviour.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use loxtest::runner::Interpreter;

/// Writes `body` to `dir/name`, creating parent directories.
pub fn write_fixture(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
    path
}

/// `sh <fixture>`: the fixture is its own interpreter.
pub fn shell() -> Interpreter {
    Interpreter::new("sh").with_args(["{fixture}"])
}

pub const HELLO: &str = "echo Hello # // expect: Hello\n";

pub const RUNTIME_ERROR: &str = "\
echo \"Undefined variable 'x'.\" >&2 # // expect runtime error: Undefined variable 'x'.
echo '[line 1] in script' >&2
exit 70
";

pub const COMPILE_ERROR: &str = "\
echo \"[line 2] Error at 'x': Unexpected.\" >&2
exit 65 # // Error at 'x': Unexpected.
";
