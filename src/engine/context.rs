//! Per-candidate working state threaded through the pipeline stages.

use serde::Serialize;
use strum_macros::Display;

use crate::config::TimeframePlan;
use crate::domain::Direction;

/// Why a candidate fell out of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiscardReason {
    #[strum(serialize = "insufficient history")]
    InsufficientHistory,
    #[strum(serialize = "no pivot pattern")]
    NoPivotPattern,
    #[strum(serialize = "stale anchor")]
    StaleAnchor,
    #[strum(serialize = "weak momentum")]
    WeakMomentum,
    #[strum(serialize = "direction mismatch")]
    DirectionMismatch,
    #[strum(serialize = "dirty channel approach")]
    DirtyApproach,
    #[strum(serialize = "no continuation signal")]
    NoContinuation,
    #[strum(serialize = "no final signal")]
    NoFinalSignal,
    #[strum(serialize = "structure invalidated")]
    StructureInvalid,
}

/// Outcome of one stage: either the candidate moves on or it is dropped
/// with a reason. Stages never mutate shared state, they only return this.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate<T> {
    Pass(T),
    Discard(DiscardReason),
}

/// The pipeline stages, in order. Used by the trace so tests can assert a
/// candidate never skipped a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PipelineStage {
    #[strum(serialize = "pattern")]
    Pattern,
    #[strum(serialize = "momentum")]
    Momentum,
    #[strum(serialize = "confirmation")]
    Confirmation,
    #[strum(serialize = "pullback")]
    Pullback,
    #[strum(serialize = "signal")]
    Signal,
    #[strum(serialize = "structure")]
    Structure,
}

impl PipelineStage {
    pub const ORDER: [PipelineStage; 6] = [
        PipelineStage::Pattern,
        PipelineStage::Momentum,
        PipelineStage::Confirmation,
        PipelineStage::Pullback,
        PipelineStage::Signal,
        PipelineStage::Structure,
    ];
}

/// Stage entries for one candidate, in the order they ran.
#[derive(Debug, Clone, Default)]
pub struct StageTrace {
    pub entered: Vec<PipelineStage>,
}

impl StageTrace {
    pub fn enter(&mut self, stage: PipelineStage) {
        self.entered.push(stage);
    }

    /// True when the entered stages form a prefix of the canonical order.
    pub fn is_contiguous(&self) -> bool {
        self.entered
            .iter()
            .zip(PipelineStage::ORDER.iter())
            .all(|(a, b)| a == b)
            && self.entered.len() <= PipelineStage::ORDER.len()
    }
}

/// Typed diagnostic fields, populated incrementally as stages run. The
/// presentation layer reads these directly instead of parsing strings.
#[derive(Debug, Clone, Serialize)]
pub struct StageDiagnostics {
    pub timeframes: TimeframePlan,
    pub momentum_peak: Option<f64>,
    pub momentum_end: Option<f64>,
    pub signal_count: usize,
}

impl StageDiagnostics {
    pub fn new(timeframes: TimeframePlan) -> Self {
        Self {
            timeframes,
            momentum_peak: None,
            momentum_end: None,
            signal_count: 0,
        }
    }
}

/// One symbol's working record, created when Stage 1 finds a pivot pattern
/// and carried through the remaining stages.
#[derive(Debug, Clone)]
pub struct CandidateContext {
    pub symbol: String,
    pub direction: Direction,
    pub anchor_ts: i64,
    pub diagnostics: StageDiagnostics,

    /// Signal timestamps from Stage 3, ascending.
    pub signal_timestamps: Vec<i64>,
    pub latest_signal_price: Option<f64>,
}

impl CandidateContext {
    pub fn new(symbol: &str, direction: Direction, anchor_ts: i64, plan: TimeframePlan) -> Self {
        Self {
            symbol: symbol.to_owned(),
            direction,
            anchor_ts,
            diagnostics: StageDiagnostics::new(plan),
            signal_timestamps: Vec::new(),
            latest_signal_price: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_accepts_a_prefix_and_rejects_a_skip() {
        let mut trace = StageTrace::default();
        trace.enter(PipelineStage::Pattern);
        trace.enter(PipelineStage::Momentum);
        assert!(trace.is_contiguous());

        let mut skipped = StageTrace::default();
        skipped.enter(PipelineStage::Pattern);
        skipped.enter(PipelineStage::Pullback);
        assert!(!skipped.is_contiguous());
    }
}
