//! Filesystem helpers for the comparison engine
//!
//! - Entry metadata with `lstat` semantics
//! - Streaming content digests

pub mod digest;
pub mod types;

pub use digest::file_digest;
pub use types::{EntryKind, EntryMeta};
