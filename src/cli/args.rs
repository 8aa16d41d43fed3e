//! Defines the command-line arguments and subcommands for the loxtest CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "loxtest",
    version,
    about = "Run annotated Lox fixtures against an interpreter and check its output."
)]
pub struct LoxtestArgs {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every selected suite and report failures.
    Run(RunArgs),
    /// Print the expectations parsed from a single fixture as JSON.
    Parse {
        /// The fixture to parse.
        #[arg(required = true)]
        fixture: PathBuf,
        /// Interpreter implementation tag used for `[<lang> line N]` directives.
        #[arg(long)]
        language: Option<String>,
        /// Configuration file (defaults to ./loxtest.yaml when present).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the suites that would run and how many fixtures each holds.
    List(SourceArgs),
}

/// Where suites come from: a config file, command-line flags, or both.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Configuration file (defaults to ./loxtest.yaml when present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Interpreter executable. Replaces the configured suites with a single suite.
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Argument template for --interpreter; `{fixture}` marks the fixture path.
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Interpreter implementation tag, e.g. `java` or `c`.
    #[arg(long)]
    pub language: Option<String>,

    /// Fixture root directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// With --interpreter, run each subdirectory of the root as its own suite.
    #[arg(long)]
    pub per_directory: bool,

    /// Only run suites with this name (repeatable).
    #[arg(long = "suite", value_name = "NAME")]
    pub suites: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Worker threads (0 = one per CPU).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-fixture timeout in seconds (0 disables it).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}
