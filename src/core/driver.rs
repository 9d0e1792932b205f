use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::chains::ChainSpec;
use crate::core::tracker::SequenceTracker;
use crate::core::types::{BlockRange, OutboundEvent, Progress};
use crate::kvdb::{KeyRange, RowStore};
use crate::store::{BlockStore, WalkStep};

/// Cooperative cancellation flag shared between a live channel and the scan
/// it drives. Checked once per observation.
#[derive(Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outbound event consumer. The live channel implements this; tests collect
/// into a buffer.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OutboundEvent);
}

/// One position observation: where we are in the sequence and whether the
/// record behind it is fully populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub position: u64,
    pub complete: bool,
}

/// A lazy, ordered stream of observations. Sources yield positions in
/// ascending order; the visitor returns `false` to abort early without
/// error. Entries that fail to parse are skipped, never surfaced.
#[async_trait]
pub trait ObservationSource: Send {
    async fn for_each(
        &mut self,
        visit: &mut (dyn FnMut(Observation) -> bool + Send),
    ) -> Result<()>;
}

/// How tracker positions relate to reported block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSpace {
    /// Positions are block numbers.
    Direct,
    /// Positions are inverted keys (`u32::MAX - block_num`), fed ascending
    /// by tables stored in descending block order. Reported ranges are
    /// mapped back to real block numbers.
    InvertedU32,
}

impl PositionSpace {
    fn map_range(self, range: BlockRange) -> BlockRange {
        match self {
            PositionSpace::Direct => range,
            PositionSpace::InvertedU32 => BlockRange {
                start_block: u32::MAX - range.end_block,
                end_block: u32::MAX - range.start_block,
                message: range.message,
                status: range.status,
            },
        }
    }
}

/// Summary returned by a finished (or cancelled) scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub observations: u64,
    pub skipped_out_of_order: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Drives a [`SequenceTracker`] over one observation source, forwarding
/// range events and periodic progress heartbeats to the sink.
pub struct ScanDriver {
    /// Emit a `Progress` heartbeat every this many observations, range
    /// events or not, so long silent scans still show liveness.
    pub progress_every: u64,
    pub space: PositionSpace,
}

impl ScanDriver {
    pub fn new(progress_every: u64, space: PositionSpace) -> Self {
        Self {
            progress_every: progress_every.max(1),
            space,
        }
    }

    pub async fn run(
        &self,
        source: &mut dyn ObservationSource,
        tracker: &mut SequenceTracker,
        sink: &dyn EventSink,
        cancel: &CancelSignal,
    ) -> Result<ScanStats> {
        let started_at = Instant::now();
        let space = self.space;
        let progress_every = self.progress_every;
        let mut seen: u64 = 0;
        let mut cancelled = false;

        sink.emit(OutboundEvent::Progress(Progress { elapsed: 0 }));

        let walk_result = source
            .for_each(&mut |observation| {
                if cancel.is_cancelled() {
                    cancelled = true;
                    return false;
                }

                seen += 1;
                for event in tracker.observe(observation.position, observation.complete) {
                    sink.emit(OutboundEvent::BlockRange(space.map_range(event)));
                }

                if seen % progress_every == 0 {
                    sink.emit(OutboundEvent::Progress(Progress {
                        elapsed: started_at.elapsed().as_millis() as u64,
                    }));
                }
                true
            })
            .await;

        // Close out the trailing range exactly once on every exit path, so a
        // cancelled or failed scan still reports what it actually saw.
        for event in tracker.finalize() {
            sink.emit(OutboundEvent::BlockRange(space.map_range(event)));
        }
        walk_result?;

        let stats = ScanStats {
            observations: tracker.observations(),
            skipped_out_of_order: tracker.skipped_out_of_order(),
            elapsed: started_at.elapsed(),
            cancelled,
        };
        debug!(
            observations = stats.observations,
            cancelled = stats.cancelled,
            "scan drive finished"
        );
        Ok(stats)
    }
}

/// Walks a block-archive store listing, extracting the leading block number
/// from each file name with the configured pattern (first capture group).
pub struct StoreWalkSource {
    store: Arc<dyn BlockStore>,
    prefix: String,
    pattern: Regex,
}

impl StoreWalkSource {
    pub fn new(store: Arc<dyn BlockStore>, prefix: impl Into<String>, pattern: Regex) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            pattern,
        }
    }
}

#[async_trait]
impl ObservationSource for StoreWalkSource {
    async fn for_each(
        &mut self,
        visit: &mut (dyn FnMut(Observation) -> bool + Send),
    ) -> Result<()> {
        let pattern = &self.pattern;
        self.store.walk(&self.prefix, "", &mut |name| {
            let Some(position) = extract_position(pattern, name) else {
                return WalkStep::Continue;
            };
            if visit(Observation {
                position,
                complete: true,
            }) {
                WalkStep::Continue
            } else {
                WalkStep::Stop
            }
        })
    }
}

/// Same extraction as [`StoreWalkSource`], over an already-materialized
/// ordered name list (bounded listing APIs).
pub struct FileListSource {
    names: Vec<String>,
    pattern: Regex,
}

impl FileListSource {
    pub fn new(names: Vec<String>, pattern: Regex) -> Self {
        Self { names, pattern }
    }
}

#[async_trait]
impl ObservationSource for FileListSource {
    async fn for_each(
        &mut self,
        visit: &mut (dyn FnMut(Observation) -> bool + Send),
    ) -> Result<()> {
        for name in &self.names {
            let Some(position) = extract_position(&self.pattern, name) else {
                continue;
            };
            if !visit(Observation {
                position,
                complete: true,
            }) {
                break;
            }
        }
        Ok(())
    }
}

fn extract_position(pattern: &Regex, name: &str) -> Option<u64> {
    let captures = pattern.captures(name)?;
    captures.get(1)?.as_str().parse::<u64>().ok()
}

/// Ordered scan over a chain's blocks table. Positions are fed in inverted
/// key space (ascending); completeness is the chain's required column set.
pub struct RowScanSource {
    store: Arc<dyn RowStore>,
    spec: &'static ChainSpec,
    range: KeyRange,
}

impl RowScanSource {
    pub fn new(store: Arc<dyn RowStore>, spec: &'static ChainSpec) -> Self {
        let range = spec.block_scan_range();
        Self { store, spec, range }
    }

    pub fn with_range(store: Arc<dyn RowStore>, spec: &'static ChainSpec, range: KeyRange) -> Self {
        Self { store, spec, range }
    }
}

#[async_trait]
impl ObservationSource for RowScanSource {
    async fn for_each(
        &mut self,
        visit: &mut (dyn FnMut(Observation) -> bool + Send),
    ) -> Result<()> {
        let spec = self.spec;
        self.store
            .scan_rows(&self.range, true, &mut |row| {
                let Some(block_num) = spec.decode_block_row_key(&row.key) else {
                    return true;
                };
                visit(Observation {
                    position: u64::from(u32::MAX - block_num),
                    complete: spec.block_row_is_complete(&row),
                })
            })
            .await
    }
}
