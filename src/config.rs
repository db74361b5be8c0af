//! Configuration types for difftree
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Log destination selection

use crate::engine::CompareOptions;
use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Compare two directory trees
#[derive(Parser, Debug, Clone)]
#[command(
    name = "difftree",
    version,
    about = "Compare two directory trees",
    long_about = "Walks TREE1 and compares every entry with its counterpart under TREE2.\n\n\
                  Entries are compared by type, then permission bits, then content:\n\
                  directories by their immediate child names, regular files by size\n\
                  (and SHA-256 digest with --check-hashes), symlinks by target.",
    after_help = "EXAMPLES:\n    \
        difftree /backup/2024 /data\n    \
        difftree --check-hashes -w 16 -p /mnt/old /mnt/new\n    \
        difftree --ignore .git --ignore target --log-file - src1 src2"
)]
pub struct CliArgs {
    /// Reference tree (walked)
    #[arg(value_name = "TREE1")]
    pub tree1: PathBuf,

    /// Tree compared against TREE1
    #[arg(value_name = "TREE2")]
    pub tree2: PathBuf,

    /// Compare regular file contents by digest
    #[arg(long)]
    pub check_hashes: bool,

    /// Log destination: empty discards logs, "-" is stderr
    #[arg(long, default_value = "", value_name = "FILE")]
    pub log_file: String,

    /// Basename to ignore entirely (can be repeated)
    #[arg(long = "ignore", value_name = "NAME", action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Number of comparator threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Show a progress spinner on stderr
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (debug-level logs)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Where log output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// No log output
    Discard,
    /// Standard error
    Stderr,
    /// A file, created or truncated
    File(PathBuf),
}

impl LogTarget {
    /// Interpret the `--log-file` value
    pub fn parse(value: &str) -> Self {
        match value {
            "" => LogTarget::Discard,
            "-" => LogTarget::Stderr,
            path => LogTarget::File(PathBuf::from(path)),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Reference tree root
    pub tree1: PathBuf,

    /// Second tree root
    pub tree2: PathBuf,

    /// Engine options
    pub options: CompareOptions,

    /// Number of worker threads
    pub worker_count: usize,

    /// Log destination
    pub log_target: LogTarget,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl CompareConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        // Tree 2 may be missing or partial; that is reported per entry
        if let Err(e) = std::fs::symlink_metadata(&args.tree1) {
            return Err(ConfigError::InvalidTree {
                path: args.tree1.clone(),
                reason: e.to_string(),
            });
        }

        let options = args
            .ignore
            .iter()
            .fold(CompareOptions::new().check_hashes(args.check_hashes), |opts, name| {
                opts.ignore(name.as_str())
            });

        Ok(Self {
            tree1: args.tree1,
            tree2: args.tree2,
            options,
            worker_count: args.workers,
            log_target: LogTarget::parse(&args.log_file),
            show_progress: args.progress,
            verbose: args.verbose,
        })
    }
}
