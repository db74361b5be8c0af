//! Reporter - the single consumer of a comparison run
//!
//! The reporter drains the merged worker stream. For each unit it:
//! - bumps the counter for the unit's classification
//! - renders the report line (silent classifications render nothing)
//! - resets the unit and returns it to the free pool
//!
//! Workers finish out of order, so rendered text is parked in a
//! [`ReorderBuffer`] and written in walk order. Only text is held there;
//! the unit itself goes back to the pool straight away, so the walker is
//! never starved by a slow entry.
//!
//! After a fault (an unclassified unit, a failed write) the reporter stops
//! the run and keeps draining without writing, so no upstream stage is
//! left blocked on a full channel.

use crate::engine::counters::Counters;
use crate::engine::pool::UnitRecycler;
use crate::engine::stop::StopSignal;
use crate::engine::unit::{Classification, ComparisonUnit};
use crate::error::{EngineError, EngineResult};
use crate::fs::EntryKind;
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Live progress published by the reporter
///
/// Read by the progress display while the run is in flight.
#[derive(Debug, Default)]
pub struct ReportProgress {
    /// Units fully processed
    pub reported: AtomicU64,

    /// Bytes of tree 1 regular files processed
    pub bytes: AtomicU64,
}

impl ReportProgress {
    fn record(&self, unit: &ComparisonUnit) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        if let Some(meta) = unit.meta1 {
            if meta.kind == EntryKind::File {
                self.bytes.fetch_add(meta.size, Ordering::Relaxed);
            }
        }
    }

    /// Clear both counters before a new run
    pub fn reset(&self) {
        self.reported.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
    }
}

/// Parks rendered output until every earlier sequence number has arrived
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    /// Next sequence number to release
    next: u64,

    /// Out-of-order entries; `None` marks a silent unit
    pending: BTreeMap<u64, Option<String>>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the rendered output for `sequence`
    pub fn insert(&mut self, sequence: u64, text: Option<String>) {
        self.pending.insert(sequence, text);
    }

    /// Remove and return every entry that is now in order
    pub fn release(&mut self) -> Vec<String> {
        let mut ready = Vec::new();
        while let Some(text) = self.pending.remove(&self.next) {
            self.next += 1;
            ready.extend(text);
        }
        ready
    }

    /// Remove everything left, in sequence order, regardless of gaps
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.pending);
        if let Some(&last) = rest.keys().next_back() {
            self.next = last + 1;
        }
        rest.into_values().flatten().collect()
    }

    /// Number of parked entries
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Path of `path1` relative to the tree 1 root
///
/// The root itself (and anything outside it) reports its full path.
pub fn relative_path<'a>(path1: &'a Path, tree1: &Path) -> &'a Path {
    match path1.strip_prefix(tree1) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => path1,
    }
}

/// Render the report entry for one unit
///
/// Returns `Ok(None)` for silent classifications.
pub fn render(unit: &ComparisonUnit, tree1: &Path) -> EngineResult<Option<String>> {
    let rel = relative_path(&unit.path1, tree1).display();

    let text = match unit.classification {
        Classification::Unset => {
            return Err(EngineError::InvariantViolation {
                path: unit.path1.clone(),
                what: "unclassified result",
            })
        }
        Classification::PerfectMatch | Classification::DirSameEntries => return Ok(None),
        Classification::Error => match &unit.failure {
            Some(err) => format!("{}: DTError {}\n\n", rel, err),
            None => format!("{}: DTError {}\n\n", rel, unit.detail),
        },
        Classification::Missing => format!("{}: DTMissing; missing from tree2\n\n", rel),
        Classification::Ignored => format!("{}: DTIgnored\n\n", rel),
        Classification::DirDifferentEntries => {
            format!("{}: DTDiffEntries\n{}\n", rel, unit.detail)
        }
        Classification::Mismatch
        | Classification::DifferentTypes
        | Classification::DifferentPermissions => {
            // tag() is Some for every non-silent classification
            let tag = unit.classification.tag().unwrap_or_default();
            format!("{}: {} {}\n\n", rel, tag, unit.detail)
        }
    };

    Ok(Some(text))
}

/// Single consumer of the merged stream
pub struct Reporter<'a, W: Write> {
    /// Normalized tree 1 root
    tree1: &'a Path,

    /// Report sink
    out: &'a mut W,

    /// Return path to the free pool
    recycler: UnitRecycler,

    /// Live progress counters
    progress: &'a ReportProgress,

    /// Stop signal, triggered on a fault
    stop: StopSignal,

    /// Aggregate counters; only this reporter writes them
    counters: Counters,

    /// Rendered output waiting for earlier entries
    reorder: ReorderBuffer,

    /// First fault seen
    fault: Option<EngineError>,
}

impl<'a, W: Write> Reporter<'a, W> {
    pub fn new(
        tree1: &'a Path,
        out: &'a mut W,
        recycler: UnitRecycler,
        progress: &'a ReportProgress,
        stop: StopSignal,
    ) -> Self {
        Self {
            tree1,
            out,
            recycler,
            progress,
            stop,
            counters: Counters::default(),
            reorder: ReorderBuffer::new(),
            fault: None,
        }
    }

    /// Drain `merged` until it closes, then return the counters
    ///
    /// If a fault occurred, the stream is still drained to the end and the
    /// first fault is returned instead.
    pub fn run(mut self, merged: Receiver<ComparisonUnit>) -> EngineResult<Counters> {
        for unit in merged.iter() {
            self.process(unit);
        }

        if self.fault.is_none() {
            let rest = self.reorder.finish();
            if !rest.is_empty() {
                warn!(entries = rest.len(), "Report had gaps in walk order");
            }
            self.write_all(&rest);
        }
        if self.fault.is_none() {
            if let Err(e) = self.out.flush() {
                self.record_fault(EngineError::Output(e));
            }
        }

        match self.fault {
            Some(err) => Err(err),
            None => Ok(self.counters),
        }
    }

    fn process(&mut self, unit: ComparisonUnit) {
        if self.fault.is_none() {
            match render(&unit, self.tree1) {
                Ok(text) => {
                    self.counters.record(unit.classification);
                    if unit.classification == Classification::PerfectMatch {
                        debug!(path = %unit.path1.display(), "PerfectMatch");
                    }
                    self.reorder.insert(unit.sequence, text);
                    let ready = self.reorder.release();
                    self.write_all(&ready);
                }
                Err(err) => self.record_fault(err),
            }
        }

        self.progress.record(&unit);
        if let Err(err) = self.recycler.release(unit) {
            self.record_fault(err);
        }
    }

    fn write_all(&mut self, texts: &[String]) {
        for text in texts {
            if let Err(e) = self.out.write_all(text.as_bytes()) {
                self.record_fault(EngineError::Output(e));
                return;
            }
        }
    }

    fn record_fault(&mut self, err: EngineError) {
        if self.fault.is_none() {
            warn!(error = %err, "Stopping comparison");
            self.stop.trigger();
            self.fault = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pool::UnitPool;
    use crate::error::EntryError;
    use crate::fs::EntryMeta;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn unit(seq: u64, path: &str, class: Classification, detail: &str) -> ComparisonUnit {
        let mut unit = ComparisonUnit::new();
        unit.sequence = seq;
        unit.set_path1(Path::new(path));
        if class.is_terminal() {
            unit.classify_with(class, detail);
        }
        unit
    }

    #[test]
    fn test_reorder_buffer_releases_in_sequence() {
        let mut buf = ReorderBuffer::new();
        buf.insert(2, Some("c".into()));
        buf.insert(1, None);
        assert!(buf.release().is_empty());

        buf.insert(0, Some("a".into()));
        assert_eq!(buf.release(), vec!["a".to_string(), "c".to_string()]);
        assert!(buf.is_empty());

        buf.insert(5, Some("f".into()));
        buf.insert(4, Some("e".into()));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.finish(), vec!["e".to_string(), "f".to_string()]);
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/t1");
        assert_eq!(relative_path(Path::new("/t1/a/b"), root), Path::new("a/b"));
        assert_eq!(relative_path(Path::new("/t1"), root), Path::new("/t1"));
    }

    #[test]
    fn test_render_formats() {
        let root = Path::new("/t1");

        let missing = unit(0, "/t1/a", Classification::Missing, "");
        assert_eq!(
            render(&missing, root).unwrap().unwrap(),
            "a: DTMissing; missing from tree2\n\n"
        );

        let perms = unit(0, "/t1/p", Classification::DifferentPermissions, "x");
        assert_eq!(render(&perms, root).unwrap().unwrap(), "p: DTDiffPerms x\n\n");

        let ignored = unit(0, "/t1/skip", Classification::Ignored, "");
        assert_eq!(render(&ignored, root).unwrap().unwrap(), "skip: DTIgnored\n\n");

        let dirs = unit(
            0,
            "/t1/d",
            Classification::DirDifferentEntries,
            "dir1 has these extra entries that are missing from dir2:\n       1. a\n\n",
        );
        assert_eq!(
            render(&dirs, root).unwrap().unwrap(),
            "d: DTDiffEntries\ndir1 has these extra entries that are missing from dir2:\n       1. a\n\n\n"
        );

        let mut failed = unit(0, "/t1/e", Classification::Unset, "");
        failed.fail(EntryError::walk(Path::new("/t1/e"), "denied"));
        assert_eq!(
            render(&failed, root).unwrap().unwrap(),
            "e: DTError While walking onto /t1/e: denied\n\n"
        );

        let same = unit(0, "/t1/s", Classification::PerfectMatch, "");
        assert_eq!(render(&same, root).unwrap(), None);
    }

    #[test]
    fn test_render_unset_is_invariant_violation() {
        let unset = unit(0, "/t1/u", Classification::Unset, "");
        assert!(matches!(
            render(&unset, Path::new("/t1")),
            Err(EngineError::InvariantViolation { .. })
        ));
    }

    fn run_reporter(
        units: Vec<ComparisonUnit>,
    ) -> (EngineResult<Counters>, String, UnitPool, StopSignal, u64) {
        // Pool sized so every test unit fits back into the free channel
        let pool = UnitPool::new(units.len());
        let _ = pool.drain();
        let progress = ReportProgress::default();
        let stop = StopSignal::new(Arc::new(AtomicBool::new(false)));

        let (tx, rx) = unbounded();
        for unit in units {
            tx.send(unit).unwrap();
        }
        drop(tx);

        let mut out = Vec::new();
        let result = Reporter::new(
            Path::new("/t1"),
            &mut out,
            pool.recycler(),
            &progress,
            stop.clone(),
        )
        .run(rx);

        let reported = progress.reported.load(Ordering::Relaxed);
        (result, String::from_utf8(out).unwrap(), pool, stop, reported)
    }

    #[test]
    fn test_reporter_orders_output_and_recycles() {
        let mut file = unit(2, "/t1/b", Classification::Unset, "");
        file.meta1 = Some(EntryMeta::new(EntryKind::File, 0o644, 100));
        file.classify(Classification::PerfectMatch);

        let units = vec![
            unit(3, "/t1/c", Classification::Missing, ""),
            unit(1, "/t1/a", Classification::Mismatch, "file1 is size 1, file2 is size 2"),
            file,
            unit(0, "/t1", Classification::DirSameEntries, ""),
        ];

        let (result, out, pool, stop, reported) = run_reporter(units);
        let counters = result.unwrap();

        assert_eq!(
            out,
            "a: DTMismatch file1 is size 1, file2 is size 2\n\nc: DTMissing; missing from tree2\n\n"
        );
        assert_eq!(counters.perfect_match, 1);
        assert_eq!(counters.mismatch, 1);
        assert_eq!(counters.missing, 1);
        assert_eq!(counters.dir_same, 1);
        assert_eq!(reported, 4);
        assert!(!stop.is_set());

        let returned = pool.drain();
        assert_eq!(returned.len(), 4);
        assert!(returned.iter().all(|u| u.is_reset()));
    }

    #[test]
    fn test_reporter_fault_drains_and_stops() {
        let units = vec![
            unit(0, "/t1/x", Classification::Unset, ""),
            unit(1, "/t1/y", Classification::Missing, ""),
        ];

        let (result, out, pool, stop, _) = run_reporter(units);

        assert!(matches!(result, Err(EngineError::InvariantViolation { .. })));
        assert!(out.is_empty());
        assert!(stop.is_set());
        assert_eq!(pool.drain().len(), 2);
    }
}
