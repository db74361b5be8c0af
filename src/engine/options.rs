//! Comparison options shared read-only by every pipeline stage

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Options for one comparison run
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Digest the contents of equal-sized regular files
    pub check_hashes: bool,

    /// Basenames skipped entirely
    pub ignore: HashSet<OsString>,
}

impl CompareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable content hashing
    pub fn check_hashes(mut self, enabled: bool) -> Self {
        self.check_hashes = enabled;
        self
    }

    /// Add a basename to the ignore set
    pub fn ignore(mut self, name: impl Into<OsString>) -> Self {
        self.ignore.insert(name.into());
        self
    }

    /// Check if a basename is in the ignore set
    pub fn is_ignored(&self, name: &OsStr) -> bool {
        self.ignore.contains(name)
    }
}

/// Everything the walker and the workers need for one run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Normalized tree 1 root
    pub tree1: PathBuf,

    /// Normalized tree 2 root
    pub tree2: PathBuf,

    /// Run options
    pub options: CompareOptions,
}

impl RunContext {
    pub fn new(tree1: &Path, tree2: &Path, options: CompareOptions) -> Self {
        Self {
            tree1: normalize_root(tree1),
            tree2: normalize_root(tree2),
            options,
        }
    }
}

/// Drop trailing separators and `.` components from a root path
pub fn normalize_root(path: &Path) -> PathBuf {
    let normalized: PathBuf = path.components().collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}
