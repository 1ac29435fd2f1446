mod context;
mod pipeline;
mod report;
mod scanner;

pub use {
    context::{CandidateContext, DiscardReason, Gate, PipelineStage, StageDiagnostics, StageTrace},
    pipeline::{
        PatternSeed, SignalOutcome, SymbolOutcome, evaluate_symbol, stage1_momentum,
        stage1_pattern, stage2_confirmation, stage3_pullback, stage3_signals, stage4_structure,
    },
    report::{AcceptedBuckets, ProgressSnapshot, ScanAggregate, ScanReport, SetupRecord},
    scanner::{ProgressFn, Scanner},
};
