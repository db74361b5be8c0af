//! Parallel tree comparison engine
//!
//! A fixed set of reusable units circulates through a closed loop of
//! bounded channels, so at most `workers + 2` units exist during a run.
//!
//! # Architecture
//!
//! ```text
//!               ┌─────────────────────────┐
//!               │       TreeWalker        │
//!               │  - depth-first, sorted  │
//!               │  - ignore / prune       │
//!               └───────────┬─────────────┘
//!                           │ filled queue (W)
//!       ┌───────────────────┼───────────────────┐
//!       │                   │                   │
//! ┌─────▼─────┐       ┌─────▼─────┐       ┌─────▼─────┐
//! │ Worker 1  │       │ Worker 2  │       │ Worker N  │
//! │ classify  │       │ classify  │       │ classify  │
//! └─────┬─────┘       └─────┬─────┘       └─────┬─────┘
//!       └───────────────────┼───────────────────┘
//!                     ┌─────▼─────┐
//!                     │  Merger   │
//!                     └─────┬─────┘
//!                     ┌─────▼─────┐
//!                     │ Reporter  │──► free pool (W+2) ──► TreeWalker
//!                     └───────────┘
//! ```

pub mod classify;
pub mod coordinator;
pub mod counters;
pub mod merge;
pub mod options;
pub mod pool;
pub mod reporter;
pub mod stop;
pub mod unit;
pub mod walker;
pub mod worker;

pub use coordinator::{CompareOutcome, ComparisonEngine, ComparisonProgress};
pub use counters::Counters;
pub use options::CompareOptions;
pub use pool::UnitPool;
pub use reporter::ReportProgress;
pub use unit::{Classification, ComparisonUnit};
