//! Tree walker - the single producer of a comparison run
//!
//! The walker performs one depth-first, name-ordered traversal of tree 1.
//! For each entry it takes a blank unit from the pool, records the path,
//! walk order and metadata, makes the ignore and pruning decisions, and
//! publishes the unit to the filled queue.
//!
//! Pruning is decided by [`descent`], which looks only at the unit:
//! - ignored or unreadable directories are not descended into
//! - a directory whose tree 2 counterpart exists but is not a directory is
//!   not descended into (the worker reports `different-types`)
//! - a directory missing from tree 2 is still descended into, so each of
//!   its children is reported as `missing`

use crate::engine::options::RunContext;
use crate::engine::pool::{FilledSender, UnitAcquirer};
use crate::engine::stop::StopSignal;
use crate::engine::unit::{Classification, ComparisonUnit};
use crate::error::{EngineResult, EntryError};
use crate::fs::EntryMeta;
use std::sync::Arc;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

/// Whether the walk should visit a directory's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descent {
    /// Visit the children
    Descend,
    /// Skip the children
    Prune,
}

/// Decide whether to descend below the entry recorded in `unit`
///
/// Only meaningful when the entry is a directory.
pub fn descent(unit: &ComparisonUnit) -> Descent {
    match unit.classification {
        Classification::Ignored | Classification::Error => return Descent::Prune,
        _ => {}
    }

    match (unit.meta1, unit.meta2) {
        (Some(meta1), Some(meta2)) if meta1.is_dir() && !meta2.is_dir() => Descent::Prune,
        _ => Descent::Descend,
    }
}

/// Result of a completed walk
#[derive(Debug, Clone, Default)]
pub struct WalkSummary {
    /// Units published to the filled queue
    pub units: u64,

    /// Directories whose children were skipped
    pub pruned: u64,

    /// Whether the walk stopped before visiting every entry
    pub cancelled: bool,
}

/// Depth-first producer of comparison units
pub struct TreeWalker {
    /// Run roots and options
    ctx: Arc<RunContext>,

    /// Source of blank units
    acquirer: UnitAcquirer,

    /// Destination for filled units; dropped when the walk ends
    filled: FilledSender,

    /// Stop signal
    stop: StopSignal,
}

impl TreeWalker {
    pub fn new(
        ctx: Arc<RunContext>,
        acquirer: UnitAcquirer,
        filled: FilledSender,
        stop: StopSignal,
    ) -> Self {
        Self {
            ctx,
            acquirer,
            filled,
            stop,
        }
    }

    /// Walk tree 1, publishing one unit per entry
    ///
    /// Consumes the walker, so the filled queue closes on return.
    pub fn walk(self) -> EngineResult<WalkSummary> {
        let mut summary = WalkSummary::default();
        let mut entries = WalkDir::new(&self.ctx.tree1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        info!(root = %self.ctx.tree1.display(), "Walk starting");

        loop {
            if self.stop.is_set() {
                summary.cancelled = true;
                break;
            }

            let next = match entries.next() {
                Some(next) => next,
                None => break,
            };

            let mut unit = match self.acquirer.acquire()? {
                Some(unit) => unit,
                None => {
                    summary.cancelled = true;
                    break;
                }
            };
            unit.sequence = summary.units;

            let is_dir = match next {
                Ok(entry) => {
                    let is_dir = entry.file_type().is_dir();
                    self.record_entry(&mut unit, &entry);
                    is_dir
                }
                Err(err) => {
                    self.record_error(&mut unit, &err);
                    false
                }
            };

            if is_dir && descent(&unit) == Descent::Prune {
                debug!(path = %unit.path1.display(), "Not descending");
                entries.skip_current_dir();
                summary.pruned += 1;
            }

            trace!(path = %unit.path1.display(), "Walked onto");
            self.filled.publish(unit)?;
            summary.units += 1;
        }

        info!(
            units = summary.units,
            pruned = summary.pruned,
            cancelled = summary.cancelled,
            "Walk finished"
        );

        Ok(summary)
    }

    /// Fill a unit from a successfully walked entry
    fn record_entry(&self, unit: &mut ComparisonUnit, entry: &walkdir::DirEntry) {
        unit.set_path1(entry.path());

        let meta1 = match entry.metadata() {
            Ok(meta) => EntryMeta::from_metadata(&meta),
            Err(err) => {
                let reason = walk_reason(&err);
                unit.fail(EntryError::walk(entry.path(), reason));
                return;
            }
        };
        unit.meta1 = Some(meta1);

        if self.ctx.options.is_ignored(entry.file_name()) {
            unit.classify(Classification::Ignored);
            return;
        }

        if meta1.is_dir() {
            // An unreadable directory is one error entry; pruning it keeps
            // walkdir from yielding its read failure a second time
            if let Err(err) = std::fs::read_dir(entry.path()) {
                unit.fail(EntryError::read_dir(entry.path(), err));
                return;
            }

            // Resolve tree 2 early; the pruning decision depends on it
            unit.compute_path2(&self.ctx.tree1, &self.ctx.tree2);
            if let Ok(meta2) = EntryMeta::lstat(&unit.path2) {
                unit.meta2 = Some(meta2);
            }
        }
    }

    /// Fill a unit from a walk failure
    fn record_error(&self, unit: &mut ComparisonUnit, err: &walkdir::Error) {
        let path = err.path().unwrap_or(self.ctx.tree1.as_path()).to_path_buf();
        unit.set_path1(&path);
        unit.fail(EntryError::walk(&path, walk_reason(err)));
    }
}

/// Underlying cause of a walk error, without walkdir's path prefix
fn walk_reason(err: &walkdir::Error) -> String {
    match err.io_error() {
        Some(io) => io.to_string(),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::options::CompareOptions;
    use crate::engine::pool::{filled_queue, UnitPool};
    use crate::fs::EntryKind;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicBool;

    fn dir() -> EntryMeta {
        EntryMeta::new(EntryKind::Directory, 0o755, 4096)
    }

    fn file() -> EntryMeta {
        EntryMeta::new(EntryKind::File, 0o644, 10)
    }

    fn unit_with(meta1: Option<EntryMeta>, meta2: Option<EntryMeta>) -> ComparisonUnit {
        let mut unit = ComparisonUnit::new();
        unit.set_path1(Path::new("/t1/d"));
        unit.meta1 = meta1;
        unit.meta2 = meta2;
        unit
    }

    #[test]
    fn test_descend_when_both_are_dirs() {
        assert_eq!(descent(&unit_with(Some(dir()), Some(dir()))), Descent::Descend);
    }

    #[test]
    fn test_descend_when_tree2_missing() {
        assert_eq!(descent(&unit_with(Some(dir()), None)), Descent::Descend);
    }

    #[test]
    fn test_prune_when_tree2_is_not_a_dir() {
        assert_eq!(descent(&unit_with(Some(dir()), Some(file()))), Descent::Prune);
    }

    #[test]
    fn test_prune_ignored_and_errors() {
        let mut ignored = unit_with(Some(dir()), Some(dir()));
        ignored.classify(Classification::Ignored);
        assert_eq!(descent(&ignored), Descent::Prune);

        let mut failed = unit_with(None, None);
        failed.fail(EntryError::walk(Path::new("/t1/d"), "denied"));
        assert_eq!(descent(&failed), Descent::Prune);
    }

    /// Run the walker to completion and collect what it published
    fn walk_all(tree1: &Path, tree2: &Path, options: CompareOptions) -> Vec<(u64, PathBuf, Classification)> {
        let pool = UnitPool::new(64);
        let (filled_tx, filled_rx) = filled_queue(64);
        let stop = StopSignal::new(Arc::new(AtomicBool::new(false)));
        let ctx = Arc::new(RunContext::new(tree1, tree2, options));

        let walker = TreeWalker::new(ctx, pool.acquirer(stop.clone()), filled_tx, stop);
        let recycler = pool.recycler();
        let handle = std::thread::spawn(move || walker.walk());

        let mut seen = Vec::new();
        while let Some(unit) = filled_rx.take() {
            seen.push((unit.sequence, unit.path1.clone(), unit.classification));
            recycler.release(unit).unwrap();
        }
        handle.join().unwrap().unwrap();
        seen
    }

    #[test]
    fn test_walk_order_and_ignore_pruning() {
        let t1 = tempfile::tempdir().unwrap();
        let t2 = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(t1.path().join("a/skip/deep")).unwrap();
        std::fs::write(t1.path().join("a/skip/deep/x"), b"x").unwrap();
        std::fs::write(t1.path().join("a/f"), b"f").unwrap();
        std::fs::write(t1.path().join("b"), b"b").unwrap();

        let seen = walk_all(t1.path(), t2.path(), CompareOptions::new().ignore("skip"));
        let rel: Vec<PathBuf> = seen
            .iter()
            .map(|(_, p, _)| p.strip_prefix(t1.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            rel,
            vec![
                PathBuf::from(""),
                PathBuf::from("a"),
                PathBuf::from("a/f"),
                PathBuf::from("a/skip"),
                PathBuf::from("b"),
            ]
        );
        assert_eq!(seen[3].2, Classification::Ignored);
        assert!(seen.iter().enumerate().all(|(i, (seq, _, _))| *seq == i as u64));
    }

    #[test]
    fn test_prunes_dir_that_is_file_in_tree2() {
        let t1 = tempfile::tempdir().unwrap();
        let t2 = tempfile::tempdir().unwrap();
        std::fs::create_dir(t1.path().join("d")).unwrap();
        std::fs::write(t1.path().join("d/child"), b"c").unwrap();
        std::fs::write(t2.path().join("d"), b"not a dir").unwrap();

        let seen = walk_all(t1.path(), t2.path(), CompareOptions::new());
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(_, p, _)| !p.ends_with("child")));
    }

    #[test]
    fn test_descends_into_dir_missing_from_tree2() {
        let t1 = tempfile::tempdir().unwrap();
        let t2 = tempfile::tempdir().unwrap();
        std::fs::create_dir(t1.path().join("d")).unwrap();
        std::fs::write(t1.path().join("d/child"), b"c").unwrap();

        let seen = walk_all(t1.path(), t2.path(), CompareOptions::new());
        assert_eq!(seen.len(), 3);
        assert!(seen[2].1.ends_with("d/child"));
    }

    #[test]
    fn test_missing_root_is_one_error_unit() {
        let t1 = tempfile::tempdir().unwrap();
        let t2 = tempfile::tempdir().unwrap();
        let missing = t1.path().join("nope");

        let seen = walk_all(&missing, t2.path(), CompareOptions::new());
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, missing);
        assert_eq!(seen[0].2, Classification::Error);
    }

    #[test]
    fn test_unreadable_dir_is_one_error_unit() {
        use std::os::unix::fs::PermissionsExt;

        let t1 = tempfile::tempdir().unwrap();
        let t2 = tempfile::tempdir().unwrap();
        for root in [t1.path(), t2.path()] {
            std::fs::create_dir(root.join("locked")).unwrap();
            std::fs::write(root.join("locked/inner"), b"i").unwrap();
        }
        let locked = t1.path().join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop a privileged user
        let readable = std::fs::read_dir(&locked).is_ok();
        let seen = if readable {
            Vec::new()
        } else {
            walk_all(t1.path(), t2.path(), CompareOptions::new())
        };
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].1, locked);
        assert_eq!(seen[1].2, Classification::Error);
        assert!(seen.iter().all(|(_, p, _)| !p.ends_with("inner")));
    }
}
