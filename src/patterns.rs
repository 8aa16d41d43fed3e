//! The textual patterns the harness recognises, both in fixture comments and in the
//! interpreter's stderr. Pure data; compiled once.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `// expect: <text>`; the text may be empty.
    pub static ref EXPECTED_OUTPUT: Regex = Regex::new(r"// expect: ?(.*)").unwrap();

    /// `// Error...` on the line the compile error is reported for.
    pub static ref EXPECTED_ERROR: Regex = Regex::new(r"// (Error.*)").unwrap();

    /// `// [<lang> ]line <N>] Error...`, a compile error attributed to another line,
    /// optionally scoped to one interpreter implementation.
    pub static ref ERROR_LINE: Regex =
        Regex::new(r"// \[(?:(\w+) )?line (\d+)\] (Error.*)").unwrap();

    /// `// expect runtime error: <message>`.
    pub static ref EXPECTED_RUNTIME_ERROR: Regex =
        Regex::new(r"// expect runtime error: (.+)").unwrap();

    /// A compile error as printed by the interpreter, e.g. `[line 3] Error at ';': ...`.
    /// The already-normalised `[3] Error ...` form is accepted too.
    pub static ref SYNTAX_ERROR: Regex =
        Regex::new(r"\[(?:.*line )?(\d+)\] (Error.+)").unwrap();

    /// Evidence of a stack trace frame, e.g. `[line 5] in main`.
    pub static ref STACK_TRACE: Regex = Regex::new(r"\[line \d+\]").unwrap();

    /// Everything from this marker on is not part of the test.
    pub static ref NON_TEST: Regex = Regex::new(r"// nontest").unwrap();
}
