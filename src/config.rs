//! Harness configuration.
//!
//! Loaded from `loxtest.yaml` (or an explicit `--config` path) and then overridden by
//! command-line flags. Every field has a default, so an empty file is a valid config.
//!
//! ```yaml
//! timeout_secs: 10
//! jobs: 4
//! exit_codes:
//!   compile_error: 65
//!   runtime_error: 70
//! suites:
//!   - name: java
//!     executable: java
//!     args: ["-jar", "build/lox.jar", "{fixture}"]
//!     language: java
//!     root: tests
//!     per_directory: true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::{HarnessError, Result};
use crate::expectation::ExitCodes;

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "loxtest.yaml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FIXTURE_ROOT: &str = "tests";
pub const DEFAULT_EXTENSION: &str = "lox";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub exit_codes: ExitCodes,
    /// Per-process timeout. `0` disables it.
    pub timeout_secs: u64,
    /// Worker threads; `0` lets the pool pick one per CPU.
    pub jobs: usize,
    /// Fixture file extension, without the dot.
    pub extension: String,
    /// Paths containing any of these substrings are skipped.
    pub exclude: Vec<String>,
    pub suites: Vec<SuiteConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            exit_codes: ExitCodes::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            jobs: 0,
            extension: DEFAULT_EXTENSION.to_string(),
            exclude: vec!["benchmark".to_string()],
            suites: Vec::new(),
        }
    }
}

/// One interpreter configuration and the fixtures it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    pub name: String,
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Split `root` into one suite per immediate subdirectory.
    #[serde(default)]
    pub per_directory: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURE_ROOT)
}

impl HarnessConfig {
    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document deserialises to unit, not to an empty map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Loads and validates the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let load_error = |source: Box<dyn std::error::Error + Send + Sync>| HarnessError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        };
        let text = fs::read_to_string(path).map_err(|e| load_error(e.into()))?;
        let config = Self::from_yaml_str(&text).map_err(|e| load_error(e.into()))?;
        config.validate()?;
        debug!(path = %path.display(), suites = config.suites.len(), "loaded configuration");
        Ok(config)
    }

    /// Loads `explicit` if given, else the default file if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            return Err(HarnessError::config("extension must not be empty"));
        }
        if self.exit_codes.compile_error == self.exit_codes.runtime_error {
            return Err(HarnessError::config(format!(
                "compile and runtime error codes must differ (both are {})",
                self.exit_codes.compile_error
            )));
        }
        for (i, suite) in self.suites.iter().enumerate() {
            if suite.name.is_empty() {
                return Err(HarnessError::config(format!("suite #{} has no name", i + 1)));
            }
            if suite.executable.is_empty() {
                return Err(HarnessError::config(format!(
                    "suite '{}' has no executable",
                    suite.name
                )));
            }
            if self.suites[..i].iter().any(|s| s.name == suite.name) {
                return Err(HarnessError::config(format!(
                    "suite '{}' is defined more than once",
                    suite.name
                )));
            }
        }
        Ok(())
    }
}
