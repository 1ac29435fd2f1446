//! Run-level aggregate state and the snapshots handed to progress callbacks.

use serde::Serialize;

use crate::analysis::ValidationRank;
use crate::domain::Direction;
use crate::engine::context::StageDiagnostics;

/// One accepted setup, ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct SetupRecord {
    pub symbol: String,
    pub direction: Direction,
    pub validation: ValidationRank,
    pub anchor_ts: i64,
    pub latest_signal_ts: i64,
    pub latest_signal_price: f64,
    pub diagnostics: StageDiagnostics,
}

/// Accepted records bucketed by direction and validation rank.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AcceptedBuckets {
    pub long_valid: Vec<SetupRecord>,
    pub long_waiting: Vec<SetupRecord>,
    pub short_valid: Vec<SetupRecord>,
    pub short_waiting: Vec<SetupRecord>,
}

impl AcceptedBuckets {
    pub fn push(&mut self, record: SetupRecord) {
        let bucket = match (record.direction, record.validation) {
            (Direction::Long, ValidationRank::Valid) => &mut self.long_valid,
            (Direction::Long, _) => &mut self.long_waiting,
            (Direction::Short, ValidationRank::Valid) => &mut self.short_valid,
            (Direction::Short, _) => &mut self.short_waiting,
        };
        bucket.push(record);
    }

    pub fn len(&self) -> usize {
        self.long_valid.len()
            + self.long_waiting.len()
            + self.short_valid.len()
            + self.short_waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, valid before waiting, longs before shorts.
    pub fn all(&self) -> Vec<SetupRecord> {
        itertools::chain!(
            &self.long_valid,
            &self.short_valid,
            &self.long_waiting,
            &self.short_waiting,
        )
        .cloned()
        .collect()
    }
}

/// Point-in-time view of a run, pushed through the progress callback and
/// returned once more as the final report body.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub symbols_total: usize,
    pub symbols_evaluated: usize,
    pub entering_stage2: usize,
    pub entering_stage3: usize,
    pub accepted: AcceptedBuckets,
}

/// Mutable aggregate for one run. Workers mutate it behind a lock owned by
/// the orchestrator; stages themselves never see this type.
#[derive(Debug)]
pub struct ScanAggregate {
    symbols_total: usize,
    symbols_evaluated: usize,
    entering_stage2: usize,
    entering_stage3: usize,
    accepted: AcceptedBuckets,
}

impl ScanAggregate {
    pub fn new(symbols_total: usize) -> Self {
        Self {
            symbols_total,
            symbols_evaluated: 0,
            entering_stage2: 0,
            entering_stage3: 0,
            accepted: AcceptedBuckets::default(),
        }
    }

    pub fn note_evaluated(&mut self) {
        self.symbols_evaluated += 1;
    }

    pub fn note_stage2_entry(&mut self) {
        self.entering_stage2 += 1;
    }

    pub fn note_stage3_entry(&mut self) {
        self.entering_stage3 += 1;
    }

    pub fn accept(&mut self, record: SetupRecord) {
        self.accepted.push(record);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            symbols_total: self.symbols_total,
            symbols_evaluated: self.symbols_evaluated,
            entering_stage2: self.entering_stage2,
            entering_stage3: self.entering_stage3,
            accepted: self.accepted.clone(),
        }
    }
}

/// The completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_ms: i64,
    pub finished_ms: i64,
    pub snapshot: ProgressSnapshot,
}

impl ScanReport {
    pub fn elapsed_ms(&self) -> i64 {
        self.finished_ms - self.started_ms
    }
}
