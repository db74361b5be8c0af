//! Comparison units - the recyclable work items of a comparison run
//!
//! A fixed number of units circulate between the walker, the workers and
//! the reporter. Ownership moves through channels, so exactly one stage
//! holds a unit at any time. Resetting a unit clears its contents but keeps
//! the capacity of its path and detail buffers.

use crate::error::EntryError;
use crate::fs::EntryMeta;
use std::path::{Path, PathBuf};

/// Terminal outcome of comparing one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Classification {
    /// Not yet classified
    #[default]
    Unset,
    /// Same type, permissions and content
    PerfectMatch,
    /// Path is absent from tree 2
    Missing,
    /// Same type and permissions, different content
    Mismatch,
    /// Different entry types
    DifferentTypes,
    /// Same type, different permission bits
    DifferentPermissions,
    /// Directories with the same child names
    DirSameEntries,
    /// Directories with different child names
    DirDifferentEntries,
    /// An I/O failure prevented the comparison
    Error,
    /// Basename is in the ignore set
    Ignored,
}

impl Classification {
    /// Report tag, or `None` for the silent classifications
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Classification::Mismatch => Some("DTMismatch"),
            Classification::Missing => Some("DTMissing"),
            Classification::DifferentTypes => Some("DTDiffTypes"),
            Classification::DifferentPermissions => Some("DTDiffPerms"),
            Classification::Ignored => Some("DTIgnored"),
            Classification::Error => Some("DTError"),
            Classification::DirDifferentEntries => Some("DTDiffEntries"),
            Classification::PerfectMatch
            | Classification::DirSameEntries
            | Classification::Unset => None,
        }
    }

    /// Check if this is a terminal classification
    pub fn is_terminal(&self) -> bool {
        *self != Classification::Unset
    }

    /// Silent classifications only bump a counter
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            Classification::PerfectMatch | Classification::DirSameEntries
        )
    }
}

/// One path's comparison task and result
#[derive(Debug, Default)]
pub struct ComparisonUnit {
    /// Walk order, assigned by the walker
    pub sequence: u64,

    /// Path in tree 1
    pub path1: PathBuf,

    /// Corresponding path in tree 2
    pub path2: PathBuf,

    /// Tree 1 metadata
    pub meta1: Option<EntryMeta>,

    /// Tree 2 metadata, present once resolved
    pub meta2: Option<EntryMeta>,

    /// Captured I/O failure
    pub failure: Option<EntryError>,

    /// Outcome
    pub classification: Classification,

    /// Explanation for non-trivial outcomes
    pub detail: String,
}

impl ComparisonUnit {
    /// Create an empty unit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty unit with preallocated path and detail buffers
    pub fn with_capacity(path_capacity: usize) -> Self {
        Self {
            path1: PathBuf::with_capacity(path_capacity),
            path2: PathBuf::with_capacity(path_capacity),
            detail: String::with_capacity(path_capacity),
            ..Self::default()
        }
    }

    /// Clear every field, keeping buffer capacity for reuse
    pub fn reset(&mut self) {
        self.sequence = 0;
        self.path1.as_mut_os_string().clear();
        self.path2.as_mut_os_string().clear();
        self.meta1 = None;
        self.meta2 = None;
        self.failure = None;
        self.classification = Classification::Unset;
        self.detail.clear();
    }

    /// Check that no data survives from a previous cycle
    pub fn is_reset(&self) -> bool {
        self.sequence == 0
            && self.path1.as_os_str().is_empty()
            && self.path2.as_os_str().is_empty()
            && self.meta1.is_none()
            && self.meta2.is_none()
            && self.failure.is_none()
            && self.classification == Classification::Unset
            && self.detail.is_empty()
    }

    /// Check whether tree 2 metadata has been resolved
    pub fn has_meta2(&self) -> bool {
        self.meta2.is_some()
    }

    /// Set the tree 1 path, reusing the existing buffer
    pub fn set_path1(&mut self, path: &Path) {
        self.path1.as_mut_os_string().clear();
        self.path1.push(path);
    }

    /// Compute `path2` as `tree2_root` joined with `path1` relative to `tree1_root`
    ///
    /// The tree 1 root itself maps to the tree 2 root.
    pub fn compute_path2(&mut self, tree1_root: &Path, tree2_root: &Path) {
        self.path2.as_mut_os_string().clear();
        self.path2.push(tree2_root);
        if let Ok(relative) = self.path1.strip_prefix(tree1_root) {
            if !relative.as_os_str().is_empty() {
                self.path2.push(relative);
            }
        }
    }

    /// Record the outcome
    pub fn classify(&mut self, classification: Classification) {
        debug_assert!(
            !self.classification.is_terminal(),
            "unit {} classified twice",
            self.path1.display()
        );
        self.classification = classification;
    }

    /// Record the outcome with an explanation
    pub fn classify_with(&mut self, classification: Classification, detail: impl AsRef<str>) {
        self.classify(classification);
        self.detail.clear();
        self.detail.push_str(detail.as_ref());
    }

    /// Record an I/O failure as the `Error` outcome
    pub fn fail(&mut self, err: EntryError) {
        self.classify(Classification::Error);
        self.failure = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::EntryKind;

    #[test]
    fn test_reset_clears_everything() {
        let mut unit = ComparisonUnit::new();
        unit.sequence = 7;
        unit.set_path1(Path::new("/t1/a/b"));
        unit.compute_path2(Path::new("/t1"), Path::new("/t2"));
        unit.meta1 = Some(EntryMeta::new(EntryKind::File, 0o644, 3));
        unit.meta2 = Some(EntryMeta::new(EntryKind::File, 0o644, 3));
        unit.classify_with(Classification::Mismatch, "different");
        assert!(!unit.is_reset());

        unit.reset();
        assert!(unit.is_reset());
    }

    #[test]
    fn test_compute_path2() {
        let mut unit = ComparisonUnit::new();
        unit.set_path1(Path::new("/t1/a/b.txt"));
        unit.compute_path2(Path::new("/t1"), Path::new("/other/t2"));
        assert_eq!(unit.path2, PathBuf::from("/other/t2/a/b.txt"));
    }

    #[test]
    fn test_compute_path2_for_root() {
        let mut unit = ComparisonUnit::new();
        unit.set_path1(Path::new("/t1"));
        unit.compute_path2(Path::new("/t1"), Path::new("/t2"));
        assert_eq!(unit.path2, PathBuf::from("/t2"));
    }

    #[test]
    fn test_tags() {
        assert_eq!(Classification::Missing.tag(), Some("DTMissing"));
        assert_eq!(Classification::PerfectMatch.tag(), None);
        assert!(Classification::DirSameEntries.is_silent());
        assert!(!Classification::Ignored.is_silent());
        assert!(!Classification::Unset.is_terminal());
    }

    #[test]
    fn test_fail_records_error() {
        let mut unit = ComparisonUnit::new();
        unit.fail(EntryError::walk(Path::new("/x"), "gone"));
        assert_eq!(unit.classification, Classification::Error);
        assert!(unit.failure.is_some());
    }
}
