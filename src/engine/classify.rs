//! Classification rules applied by the comparator workers
//!
//! The first matching rule wins:
//!
//! 1. tree 2 path absent → `missing`
//! 2. different entry types → `different-types`
//! 3. different permission bits → `different-permissions`
//! 4. two directories → name-set comparison of their immediate children
//! 5. two regular files → size, then (optionally) content digest
//! 6. two symlinks → link target comparison
//! 7. any other pair of special files → `perfect-match`

use crate::engine::options::CompareOptions;
use crate::engine::unit::{Classification, ComparisonUnit};
use crate::error::{EngineError, EngineResult, EntryError};
use crate::fs::digest::{file_digest, DIGEST_NAME};
use crate::fs::{EntryKind, EntryMeta};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use tracing::debug;

/// Classify a unit whose `path2` has been computed
///
/// Units the walker already classified (ignored, walk errors) are left as is.
/// Per-path failures land on the unit; a unit the walker published without
/// tree 1 metadata is an engine fault.
pub fn classify(unit: &mut ComparisonUnit, options: &CompareOptions) -> EngineResult<()> {
    if unit.classification.is_terminal() {
        return Ok(());
    }

    let Some(meta1) = unit.meta1 else {
        return Err(EngineError::InvariantViolation {
            path: unit.path1.clone(),
            what: "unit without tree 1 metadata",
        });
    };

    let meta2 = match unit.meta2 {
        Some(meta2) => meta2,
        None => match EntryMeta::lstat(&unit.path2) {
            Ok(meta2) => {
                unit.meta2 = Some(meta2);
                meta2
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %unit.path2.display(), "Missing");
                unit.classify(Classification::Missing);
                return Ok(());
            }
            Err(err) => {
                let err = EntryError::stat(&unit.path2, err);
                unit.fail(err);
                return Ok(());
            }
        },
    };

    if meta1.kind != meta2.kind {
        unit.classify_with(
            Classification::DifferentTypes,
            format!("file1 is a {}, but file2 is a {}", meta1.kind, meta2.kind),
        );
        return Ok(());
    }

    if meta1.perm != meta2.perm {
        unit.classify_with(
            Classification::DifferentPermissions,
            format!(
                "file1 has perms {} ({:04o}), but file2 has {} ({:04o})",
                meta1.mode_string(),
                meta1.perm,
                meta2.mode_string(),
                meta2.perm
            ),
        );
        return Ok(());
    }

    match meta1.kind {
        EntryKind::Directory => compare_directories(unit, options),
        EntryKind::File => compare_regular_files(unit, &meta1, &meta2, options),
        EntryKind::Symlink => compare_symlinks(unit),
        _ => unit.classify(Classification::PerfectMatch),
    }

    Ok(())
}

/// Read a directory's child names, skipping ignored ones
pub fn read_name_set(
    directory: &Path,
    options: &CompareOptions,
) -> Result<BTreeSet<OsString>, EntryError> {
    let entries = std::fs::read_dir(directory).map_err(|e| EntryError::read_dir(directory, e))?;

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| EntryError::read_dir(directory, e))?;
        let name = entry.file_name();
        if !options.is_ignored(&name) {
            names.insert(name);
        }
    }

    Ok(names)
}

/// Append a header and a 1-based enumerated list of names
fn write_enumerated<'a>(
    out: &mut String,
    header: &str,
    names: impl Iterator<Item = &'a OsString>,
) {
    out.push_str(header);
    out.push('\n');
    for (i, name) in names.enumerate() {
        let _ = writeln!(out, "    {:4}. {}", i + 1, name.to_string_lossy());
    }
    out.push('\n');
}

fn compare_directories(unit: &mut ComparisonUnit, options: &CompareOptions) {
    let dir1 = match read_name_set(&unit.path1, options) {
        Ok(names) => names,
        Err(err) => return unit.fail(err),
    };
    let dir2 = match read_name_set(&unit.path2, options) {
        Ok(names) => names,
        Err(err) => return unit.fail(err),
    };

    if dir1 == dir2 {
        unit.classify(Classification::DirSameEntries);
        return;
    }

    let mut detail = String::new();
    let mut dir1_extra = dir1.difference(&dir2).peekable();
    if dir1_extra.peek().is_some() {
        write_enumerated(
            &mut detail,
            "dir1 has these extra entries that are missing from dir2:",
            dir1_extra,
        );
    }

    let mut dir2_extra = dir2.difference(&dir1).peekable();
    if dir2_extra.peek().is_some() {
        write_enumerated(
            &mut detail,
            "dir2 has these extra entries that are missing from dir1:",
            dir2_extra,
        );
    }

    unit.classify_with(Classification::DirDifferentEntries, detail);
}

fn compare_regular_files(
    unit: &mut ComparisonUnit,
    meta1: &EntryMeta,
    meta2: &EntryMeta,
    options: &CompareOptions,
) {
    // Different sizes can never be the same content
    if meta1.size != meta2.size {
        unit.classify_with(
            Classification::Mismatch,
            format!("file1 is size {}, file2 is size {}", meta1.size, meta2.size),
        );
        return;
    }

    if !options.check_hashes {
        unit.classify(Classification::PerfectMatch);
        return;
    }

    let hash1 = match file_digest(&unit.path1) {
        Ok(hash) => hash,
        Err(err) => return unit.fail(err),
    };
    let hash2 = match file_digest(&unit.path2) {
        Ok(hash) => hash,
        Err(err) => return unit.fail(err),
    };

    if hash1 == hash2 {
        unit.classify(Classification::PerfectMatch);
    } else {
        unit.classify_with(
            Classification::Mismatch,
            format!(
                "file1 has {} {}, file2 has {} {}",
                DIGEST_NAME, hash1, DIGEST_NAME, hash2
            ),
        );
    }
}

fn compare_symlinks(unit: &mut ComparisonUnit) {
    let target1 = match std::fs::read_link(&unit.path1) {
        Ok(target) => target,
        Err(err) => return unit.fail(EntryError::read_link(&unit.path1, err)),
    };
    let target2 = match std::fs::read_link(&unit.path2) {
        Ok(target) => target,
        Err(err) => return unit.fail(EntryError::read_link(&unit.path2, err)),
    };

    if target1 == target2 {
        unit.classify(Classification::PerfectMatch);
    } else {
        unit.classify_with(
            Classification::Mismatch,
            format!(
                "file1 links to {}, file2 links to {}",
                target1.display(),
                target2.display()
            ),
        );
    }
}
