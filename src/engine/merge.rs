//! Fan-in merge of the workers' output channels
//!
//! A coordination thread starts one relay per worker channel. Each relay
//! copies units into the shared output channel until its worker closes.
//! The coordinator counts relay completions and drops its own sender only
//! after every relay has finished, so the shared channel closes exactly
//! once all workers are done and every unit has been forwarded.
//!
//! No ordering is imposed across relays.

use crate::engine::unit::ComparisonUnit;
use crate::error::EngineError;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Result of a completed merge
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeSummary {
    /// Relays that ran to completion
    pub relays_completed: usize,

    /// Units forwarded to the shared channel
    pub forwarded: u64,
}

/// Handle to the merge coordination thread
pub struct Merger {
    handle: Option<JoinHandle<Result<MergeSummary, EngineError>>>,
}

impl Merger {
    /// Start merging `inputs` into one stream
    ///
    /// The returned receiver yields units from every input and disconnects
    /// once all inputs are closed and drained.
    pub fn start(
        inputs: Vec<Receiver<ComparisonUnit>>,
    ) -> Result<(Receiver<ComparisonUnit>, Merger), EngineError> {
        let (out_tx, out_rx) = bounded(0);

        let handle = thread::Builder::new()
            .name("merger".to_string())
            .spawn(move || coordinate(inputs, out_tx))
            .map_err(|e| EngineError::SpawnFailed {
                stage: "merger".to_string(),
                reason: e.to_string(),
            })?;

        Ok((
            out_rx,
            Merger {
                handle: Some(handle),
            },
        ))
    }

    /// Wait for the coordinator to finish
    pub fn join(mut self) -> Result<MergeSummary, EngineError> {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(EngineError::Panicked {
                    stage: "merger".to_string(),
                })
            }),
            None => Ok(MergeSummary::default()),
        }
    }
}

fn coordinate(
    inputs: Vec<Receiver<ComparisonUnit>>,
    out_tx: Sender<ComparisonUnit>,
) -> Result<MergeSummary, EngineError> {
    let mut relays = Vec::with_capacity(inputs.len());
    let mut first_error = None;

    for (id, input) in inputs.into_iter().enumerate() {
        let out = out_tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("relay-{}", id))
            .spawn(move || relay(input, out));

        match spawned {
            Ok(handle) => relays.push((id, handle)),
            Err(e) => {
                // The unspawned input is dropped here, which fails its worker's sends
                first_error.get_or_insert(EngineError::SpawnFailed {
                    stage: format!("relay-{}", id),
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut summary = MergeSummary::default();
    for (id, handle) in relays {
        match handle.join() {
            Ok(forwarded) => {
                summary.relays_completed += 1;
                summary.forwarded += forwarded;
            }
            Err(_) => {
                first_error.get_or_insert(EngineError::Panicked {
                    stage: format!("relay-{}", id),
                });
            }
        }
    }

    // Last sender: the merged stream closes here
    drop(out_tx);
    debug!(
        relays = summary.relays_completed,
        forwarded = summary.forwarded,
        "Merge finished"
    );

    match first_error {
        Some(err) => Err(err),
        None => Ok(summary),
    }
}

/// Copy units from one worker into the shared channel
fn relay(input: Receiver<ComparisonUnit>, out: Sender<ComparisonUnit>) -> u64 {
    let mut forwarded = 0;
    for unit in input.iter() {
        if out.send(unit).is_err() {
            break;
        }
        forwarded += 1;
    }
    forwarded
}
