//! Per-classification counters and the fixed-format summary
//!
//! Only the reporter writes these, so plain integers are enough.

use crate::engine::unit::Classification;
use std::fmt;

/// Counts of each terminal classification in one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub perfect_match: u64,
    pub mismatch: u64,
    pub missing: u64,
    pub different_types: u64,
    pub different_permissions: u64,
    pub ignored: u64,
    pub errors: u64,
    pub dir_same: u64,
    pub dir_different: u64,
}

impl Counters {
    /// Increment the counter for `classification`
    ///
    /// Returns false for `Unset`, which has no counter.
    pub fn record(&mut self, classification: Classification) -> bool {
        let slot = match classification {
            Classification::PerfectMatch => &mut self.perfect_match,
            Classification::Mismatch => &mut self.mismatch,
            Classification::Missing => &mut self.missing,
            Classification::DifferentTypes => &mut self.different_types,
            Classification::DifferentPermissions => &mut self.different_permissions,
            Classification::Ignored => &mut self.ignored,
            Classification::Error => &mut self.errors,
            Classification::DirSameEntries => &mut self.dir_same,
            Classification::DirDifferentEntries => &mut self.dir_different,
            Classification::Unset => return false,
        };
        *slot += 1;
        true
    }

    /// Total units counted
    pub fn total(&self) -> u64 {
        self.perfect_match
            + self.mismatch
            + self.missing
            + self.different_types
            + self.different_permissions
            + self.ignored
            + self.errors
            + self.dir_same
            + self.dir_different
    }

    /// Units that differ between the trees in any way
    pub fn differences(&self) -> u64 {
        self.mismatch
            + self.missing
            + self.different_types
            + self.different_permissions
            + self.dir_different
    }

    /// The summary table
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SUMMARY")?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "# Perfect Matches:              {:8}", self.perfect_match)?;
        writeln!(f, "# Mismatches:                   {:8} DTMismatch", self.mismatch)?;
        writeln!(f, "# Missing:                      {:8} DTMissing", self.missing)?;
        writeln!(f, "# Different Types:              {:8} DTDiffTypes", self.different_types)?;
        writeln!(f, "# Different Perms:              {:8} DTDiffPerms", self.different_permissions)?;
        writeln!(f, "# Ignored (by user):            {:8} DTIgnored", self.ignored)?;
        writeln!(f, "# Errors while reading:         {:8} DTError", self.errors)?;
        writeln!(f)?;
        writeln!(f, "# Dirs with same entries:       {:8}", self.dir_same)?;
        writeln!(f, "# Dirs with different entries:  {:8} DTDiffEntries", self.dir_different)
    }
}
