//! Error types for difftree
//!
//! This module defines the error hierarchy used by the comparison engine:
//! - Per-path I/O failures, which are captured on a comparison unit and
//!   reported as the `error` classification
//! - Engine faults, which abort a comparison run
//! - Configuration and CLI errors
//!
//! Per-path failures never abort a run; only engine faults do.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for difftree
#[derive(Error, Debug)]
pub enum DiffTreeError {
    /// Comparison engine faults
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors outside of a comparison run
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure on a single path, captured on the comparison unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// Could not stat or read an entry while walking tree 1
    #[error("While walking onto {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    /// Could not stat the tree 2 counterpart (other than not-found)
    #[error("Failed to stat '{path}': {reason}")]
    Stat { path: PathBuf, reason: String },

    /// Could not list a directory's children
    #[error("Failed to read directory '{path}': {reason}")]
    ReadDir { path: PathBuf, reason: String },

    /// Could not open or read a file being digested
    #[error("Failed to hash '{path}': {reason}")]
    Hash { path: PathBuf, reason: String },

    /// Could not read a symlink's target
    #[error("Failed to read link '{path}': {reason}")]
    ReadLink { path: PathBuf, reason: String },
}

impl EntryError {
    /// Create a walk error from a path and a cause
    pub fn walk(path: &Path, err: impl std::fmt::Display) -> Self {
        EntryError::Walk {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Create a stat error from a path and a cause
    pub fn stat(path: &Path, err: impl std::fmt::Display) -> Self {
        EntryError::Stat {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Create a directory listing error from a path and a cause
    pub fn read_dir(path: &Path, err: impl std::fmt::Display) -> Self {
        EntryError::ReadDir {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Create a hashing error from a path and a cause
    pub fn hash(path: &Path, err: impl std::fmt::Display) -> Self {
        EntryError::Hash {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Create a read-link error from a path and a cause
    pub fn read_link(path: &Path, err: impl std::fmt::Display) -> Self {
        EntryError::ReadLink {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Returns the path associated with this error
    pub fn path(&self) -> &Path {
        match self {
            EntryError::Walk { path, .. }
            | EntryError::Stat { path, .. }
            | EntryError::ReadDir { path, .. }
            | EntryError::Hash { path, .. }
            | EntryError::ReadLink { path, .. } => path,
        }
    }
}

/// Unrecoverable comparison engine faults
#[derive(Error, Debug)]
pub enum EngineError {
    /// The free unit channel closed while the walker still needed units
    #[error("Couldn't read from the free unit pool: channel closed")]
    PoolClosed,

    /// The filled queue closed while the walker was publishing
    #[error("Filled queue closed unexpectedly")]
    FilledQueueClosed,

    /// A pipeline channel closed while a stage was still sending
    #[error("{stage} channel closed unexpectedly")]
    ChannelClosed { stage: String },

    /// Failed to start a pipeline thread
    #[error("Failed to spawn {stage} thread: {reason}")]
    SpawnFailed { stage: String, reason: String },

    /// A pipeline thread panicked
    #[error("{stage} thread panicked")]
    Panicked { stage: String },

    /// A unit reached a stage in a state the walker never produces
    #[error("Got {what} for path {path}")]
    InvariantViolation { path: PathBuf, what: &'static str },

    /// Units went missing from the pool during the run
    #[error("Pool holds {found} units after the run, expected {expected}")]
    UnitsLost { expected: usize, found: usize },

    /// Writing the report failed
    #[error("Failed to write report: {0}")]
    Output(#[source] std::io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Tree root is unusable
    #[error("Invalid tree root '{path}': {reason}")]
    InvalidTree { path: PathBuf, reason: String },

    /// Could not create the log file
    #[error("Cannot create {path} for logging: {reason}")]
    LogFile { path: PathBuf, reason: String },
}

/// Result type alias for DiffTreeError
pub type Result<T> = std::result::Result<T, DiffTreeError>;

/// Result type alias for EngineError
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_error_path() {
        let err = EntryError::hash(Path::new("/a/b"), "boom");
        assert_eq!(err.path(), Path::new("/a/b"));
        assert_eq!(err.to_string(), "Failed to hash '/a/b': boom");
    }

    #[test]
    fn test_walk_error_message() {
        let err = EntryError::walk(Path::new("/t1/x"), "permission denied");
        assert_eq!(
            err.to_string(),
            "While walking onto /t1/x: permission denied"
        );
    }

    #[test]
    fn test_error_conversion() {
        let engine_err = EngineError::PoolClosed;
        let top: DiffTreeError = engine_err.into();
        assert!(matches!(top, DiffTreeError::Engine(EngineError::PoolClosed)));
    }
}
