//! difftree - Parallel Directory Tree Comparison
//!
//! Recursively compares two directory trees and classifies every path of the
//! first tree as identical, mismatched, missing, type-different,
//! permission-different, or (for directories) holding a different set of
//! child names. Read-only and diagnostic: nothing is ever modified.
//!
//! # Features
//!
//! - **Parallel Comparison**: One walker feeds a pool of comparator threads
//!   (one per logical CPU by default).
//!
//! - **Bounded Memory**: A fixed pool of `workers + 2` reusable units
//!   circulates through bounded channels, so a wide or deep walk never grows
//!   the working set and never allocates per path.
//!
//! - **Deterministic Report**: Results are written in walk order regardless
//!   of which worker finished first.
//!
//! - **Clear Tie-Breaks**: type before permissions before content; size
//!   before digest.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          TREE1                                   │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ depth-first, name order
//!                               ▼
//!                    ┌──────────────────────┐      ┌──────────────┐
//!                    │     TreeWalker       │◄─────│  Free Pool   │
//!                    │  - ignore / prune    │      │  (W+2 units) │
//!                    └──────────┬───────────┘      └──────▲───────┘
//!                               │ filled queue (W)        │
//! ┌─────────────────────────────▼──────────────────────┐  │
//! │                 Comparator Threads                  │  │
//! │  ┌─────────┐  ┌─────────┐              ┌─────────┐ │  │
//! │  │Worker 1 │  │Worker 2 │     ...      │Worker N │ │  │
//! │  └────┬────┘  └────┬────┘              └────┬────┘ │  │
//! └───────┼────────────┼────────────────────────┼──────┘  │
//!         └────────────┼────────────────────────┘         │
//!                      ▼                                  │
//!               ┌─────────────┐     ┌──────────────┐      │
//!               │   Merger    │────►│   Reporter   │──────┘
//!               └─────────────┘     │  - counters  │
//!                                   │  - report    │
//!                                   └──────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Metadata and size comparison
//! difftree /backup/2024-06-01 /data
//!
//! # Full content comparison with progress
//! difftree --check-hashes -p /mnt/old /mnt/new
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod progress;

pub use config::{CliArgs, CompareConfig, LogTarget};
pub use engine::{Classification, CompareOptions, CompareOutcome, ComparisonEngine, Counters};
pub use error::{DiffTreeError, Result};
