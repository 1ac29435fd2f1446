//! The four-stage cascading filter. Each stage is a pure function of the
//! candidate and freshly fetched data; the async driver sequences fetches
//! around them and never lets a candidate skip a stage.

use futures::future;

use crate::analysis::{
    ValidationRank, continuation_signals, final_signals, keltner_channel, structural_events,
    tdi_lines, tdi_state, validate_best,
};
use crate::analysis::indicators::adx;
use crate::config::{ScanConfig, Thresholds};
use crate::data::{FetchGate, MarketDataProvider};
use crate::domain::{CandleSeries, Direction};
use crate::engine::context::{CandidateContext, DiscardReason, Gate, PipelineStage, StageTrace};
use crate::engine::report::SetupRecord;

/// Direction and anchor distilled from the pivot pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSeed {
    pub direction: Direction,
    pub anchor_ts: i64,
}

/// All Stage-3 signal data carried forward into Stage 4.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalOutcome {
    pub timestamps: Vec<i64>,
    pub latest_ts: i64,
    pub latest_price: f64,
}

#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    Accepted(Box<SetupRecord>),
    Discarded {
        stage: PipelineStage,
        reason: DiscardReason,
    },
}

/// Classifies the last four closed pivots. A peak shape (rise into the
/// second pivot, then two falling pivots) seeds a short; the mirrored
/// trough shape seeds a long. The anchor is the turning pivot's open time.
pub fn stage1_pattern(series: &CandleSeries, now_ms: i64, config: &ScanConfig) -> Gate<PatternSeed> {
    let n = series.len();
    if n < 4 {
        return Gate::Discard(DiscardReason::InsufficientHistory);
    }

    let pivots = series.typical_prices();
    let (p0, p1, p2, p3) = (pivots[n - 4], pivots[n - 3], pivots[n - 2], pivots[n - 1]);

    let direction = if p0 < p1 && p1 > p2 && p2 > p3 {
        Direction::Short
    } else if p0 > p1 && p1 < p2 && p2 < p3 {
        Direction::Long
    } else {
        return Gate::Discard(DiscardReason::NoPivotPattern);
    };

    let anchor_ts = series.timestamps[n - 3];
    if now_ms - anchor_ts > config.anchor_age_ceiling_ms() {
        return Gate::Discard(DiscardReason::StaleAnchor);
    }

    Gate::Pass(PatternSeed {
        direction,
        anchor_ts,
    })
}

/// Momentum gate. The ADX must have cleared the threshold somewhere in the
/// anchor window and still clear it on the window's last closed bar.
/// Returns (peak, end) for the diagnostics.
pub fn stage1_momentum(series: &CandleSeries, anchor_ts: i64, th: &Thresholds) -> Gate<(f64, f64)> {
    if series.is_empty() {
        return Gate::Discard(DiscardReason::InsufficientHistory);
    }
    let trend = adx(
        &series.high_prices,
        &series.low_prices,
        &series.close_prices,
        th.adx_period,
    );

    let window: Vec<f64> = series
        .timestamps
        .iter()
        .zip(&trend)
        .filter(|(ts, _)| **ts >= anchor_ts)
        .map(|(_, v)| *v)
        .collect();

    let peak = window.iter().copied().filter(|v| v.is_finite()).fold(f64::MIN, f64::max);
    let end = match window.last() {
        Some(v) if v.is_finite() => *v,
        _ => return Gate::Discard(DiscardReason::InsufficientHistory),
    };

    if peak > th.adx_min && end > th.adx_min {
        Gate::Pass((peak, end))
    } else {
        Gate::Discard(DiscardReason::WeakMomentum)
    }
}

/// Directional confirmation on the momentum series: the fast/slow RSI cross
/// must point the candidate's way, the last close must sit on the correct
/// side of the Keltner basis, and the trailing approach must be clean (no
/// close through the far band).
pub fn stage2_confirmation(
    series: &CandleSeries,
    direction: Direction,
    th: &Thresholds,
) -> Gate<()> {
    let close = &series.close_prices;
    let tdi = tdi_lines(close, th.rsi_period, th.tdi_fast, th.tdi_slow);
    if tdi_state(&tdi) != Some(direction) {
        return Gate::Discard(DiscardReason::DirectionMismatch);
    }

    let channel = keltner_channel(
        &series.high_prices,
        &series.low_prices,
        close,
        th.keltner_period,
        th.band_mult,
    );
    let Some(i) = series.len().checked_sub(1) else {
        return Gate::Discard(DiscardReason::InsufficientHistory);
    };
    if !channel.basis[i].is_finite() {
        return Gate::Discard(DiscardReason::InsufficientHistory);
    }

    let on_side = match direction {
        Direction::Long => close[i] > channel.basis[i],
        Direction::Short => close[i] < channel.basis[i],
    };
    if !on_side {
        return Gate::Discard(DiscardReason::DirectionMismatch);
    }

    let start = series.len().saturating_sub(th.clean_approach_bars);
    let spiked = (start..series.len()).any(|j| match direction {
        Direction::Long => channel.lower[j].is_finite() && close[j] < channel.lower[j],
        Direction::Short => channel.upper[j].is_finite() && close[j] > channel.upper[j],
    });
    if spiked {
        return Gate::Discard(DiscardReason::DirtyApproach);
    }

    Gate::Pass(())
}

/// Pullback gate: the band-continuation detector must have emitted at least
/// once in the candidate direction at or after the anchor.
pub fn stage3_pullback(
    series: &CandleSeries,
    direction: Direction,
    anchor_ts: i64,
    th: &Thresholds,
) -> Gate<Vec<i64>> {
    let hits: Vec<i64> =
        continuation_signals(series, direction, th.bollinger_period, th.bollinger_mult)
            .into_iter()
            .filter(|ts| *ts >= anchor_ts)
            .collect();
    if hits.is_empty() {
        Gate::Discard(DiscardReason::NoContinuation)
    } else {
        Gate::Pass(hits)
    }
}

/// Execution gate: the final-signal detector must fire at/after the anchor.
pub fn stage3_signals(
    series: &CandleSeries,
    direction: Direction,
    anchor_ts: i64,
    th: &Thresholds,
) -> Gate<SignalOutcome> {
    let (found, timestamps) = final_signals(series, direction, Some(anchor_ts), th);
    if !found {
        return Gate::Discard(DiscardReason::NoFinalSignal);
    }
    let Some(&latest_ts) = timestamps.last() else {
        return Gate::Discard(DiscardReason::NoFinalSignal);
    };
    let Ok(idx) = series.timestamps.binary_search(&latest_ts) else {
        return Gate::Discard(DiscardReason::NoFinalSignal);
    };
    Gate::Pass(SignalOutcome {
        latest_ts,
        latest_price: series.close_prices[idx],
        timestamps,
    })
}

/// Structural gate: ranks every Stage-3 signal against the break/reversal
/// events, newest first; only an invalid best rank discards.
pub fn stage4_structure(
    series: &CandleSeries,
    direction: Direction,
    signal_timestamps: &[i64],
    th: &Thresholds,
) -> Gate<ValidationRank> {
    let events = structural_events(series, th.structure_width);
    match validate_best(&events, signal_timestamps, direction) {
        ValidationRank::Invalid => Gate::Discard(DiscardReason::StructureInvalid),
        rank => Gate::Pass(rank),
    }
}

fn discarded(stage: PipelineStage, reason: DiscardReason) -> SymbolOutcome {
    SymbolOutcome::Discarded { stage, reason }
}

/// Runs one symbol through the full cascade. Fetches happen lazily so a
/// discard skips every fetch the later stages would have needed; the
/// execution and structure series are fetched together once the cheaper
/// pullback check has passed.
pub async fn evaluate_symbol<P: MarketDataProvider>(
    fetcher: &FetchGate<P>,
    config: &ScanConfig,
    symbol: &str,
    now_ms: i64,
) -> (SymbolOutcome, StageTrace) {
    let mut trace = StageTrace::default();
    let plan = config.timeframes;
    let th = &config.thresholds;

    trace.enter(PipelineStage::Pattern);
    let pattern = fetcher
        .fetch_closed(symbol, plan.pattern, config.fetch.pattern_bars, now_ms)
        .await;
    let seed = match stage1_pattern(&pattern, now_ms, config) {
        Gate::Pass(seed) => seed,
        Gate::Discard(reason) => return (discarded(PipelineStage::Pattern, reason), trace),
    };
    let mut ctx = CandidateContext::new(symbol, seed.direction, seed.anchor_ts, plan);

    trace.enter(PipelineStage::Momentum);
    let momentum = fetcher
        .fetch_closed(symbol, plan.momentum, config.fetch.momentum_bars, now_ms)
        .await;
    match stage1_momentum(&momentum, ctx.anchor_ts, th) {
        Gate::Pass((peak, end)) => {
            ctx.diagnostics.momentum_peak = Some(peak);
            ctx.diagnostics.momentum_end = Some(end);
        }
        Gate::Discard(reason) => return (discarded(PipelineStage::Momentum, reason), trace),
    }

    trace.enter(PipelineStage::Confirmation);
    if let Gate::Discard(reason) = stage2_confirmation(&momentum, ctx.direction, th) {
        return (discarded(PipelineStage::Confirmation, reason), trace);
    }

    trace.enter(PipelineStage::Pullback);
    let pullback = fetcher
        .fetch_closed(symbol, plan.pullback, config.fetch.pullback_bars, now_ms)
        .await;
    if let Gate::Discard(reason) = stage3_pullback(&pullback, ctx.direction, ctx.anchor_ts, th) {
        return (discarded(PipelineStage::Pullback, reason), trace);
    }

    let (execution, structure) = future::join(
        fetcher.fetch_closed(symbol, plan.execution, config.fetch.execution_bars, now_ms),
        fetcher.fetch_closed(symbol, plan.structure, config.fetch.structure_bars, now_ms),
    )
    .await;

    trace.enter(PipelineStage::Signal);
    match stage3_signals(&execution, ctx.direction, ctx.anchor_ts, th) {
        Gate::Pass(outcome) => {
            ctx.diagnostics.signal_count = outcome.timestamps.len();
            ctx.latest_signal_price = Some(outcome.latest_price);
            ctx.signal_timestamps = outcome.timestamps;
        }
        Gate::Discard(reason) => return (discarded(PipelineStage::Signal, reason), trace),
    }

    trace.enter(PipelineStage::Structure);
    let validation = match stage4_structure(&structure, ctx.direction, &ctx.signal_timestamps, th) {
        Gate::Pass(rank) => rank,
        Gate::Discard(reason) => return (discarded(PipelineStage::Structure, reason), trace),
    };

    let latest_signal_ts = ctx.signal_timestamps.last().copied().unwrap_or(ctx.anchor_ts);
    let record = SetupRecord {
        symbol: ctx.symbol,
        direction: ctx.direction,
        validation,
        anchor_ts: ctx.anchor_ts,
        latest_signal_ts,
        latest_signal_price: ctx.latest_signal_price.unwrap_or(f64::NAN),
        diagnostics: ctx.diagnostics,
    };
    (SymbolOutcome::Accepted(Box::new(record)), trace)
}
