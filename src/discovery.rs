use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::diagnostics::{HarnessError, Result};

/// Fixtures found under a root, split into runnable and excluded paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFixtures {
    pub fixtures: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
}

/// Discovers fixture files on disk.
#[derive(Debug, Clone)]
pub struct FixtureDiscoverer {
    extension: String,
    exclude: Vec<String>,
}

impl FixtureDiscoverer {
    pub fn new(extension: impl Into<String>, exclude: Vec<String>) -> Self {
        Self {
            extension: extension.into(),
            exclude,
        }
    }

    fn is_fixture(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension.as_str())
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.exclude.iter().any(|pattern| text.contains(pattern.as_str()))
    }

    /// Recursively scans `root` for fixture files.
    ///
    /// Both lists are sorted to ensure deterministic execution order.
    pub fn discover<P: AsRef<Path>>(&self, root: P) -> Result<DiscoveredFixtures> {
        let root = root.as_ref();
        let mut found = DiscoveredFixtures::default();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|source| HarnessError::Discovery {
                root: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() || !self.is_fixture(entry.path()) {
                continue;
            }
            let path = entry.into_path();
            if self.is_excluded(&path) {
                found.excluded.push(path);
            } else {
                found.fixtures.push(path);
            }
        }
        found.fixtures.sort();
        found.excluded.sort();
        Ok(found)
    }
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn subdirectories(root: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| HarnessError::ReadDir {
        root: root.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        if entry.file_type().map_err(io_error)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
