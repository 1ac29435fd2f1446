//! Scan configuration surface. The pipeline core consumes this; it never
//! reaches for globals, so tests can hand in tailored configs.

use serde::{Deserialize, Serialize};

use crate::config::constants;
use crate::config::types::ScanMode;
use crate::domain::Timeframe;

/// Timeframe assignment for the four pipeline stages.
/// `pattern` is the highest, `execution` the lowest; `structure` feeds the
/// break/reversal validation in Stage 4.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeframePlan {
    pub pattern: Timeframe,
    pub momentum: Timeframe,
    pub pullback: Timeframe,
    pub execution: Timeframe,
    pub structure: Timeframe,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub adx_period: usize,
    pub adx_min: f64,

    pub keltner_period: usize,
    pub band_mult: f64,
    pub clean_approach_bars: usize,

    pub rsi_period: usize,
    pub tdi_fast: usize,
    pub tdi_slow: usize,

    pub bollinger_period: usize,
    pub bollinger_mult: f64,

    pub primary_lookback: usize,
    pub secondary_lookback: usize,

    pub pressure_low: f64,
    pub pressure_high: f64,

    pub volume_fast: usize,
    pub volume_slow: usize,

    pub structure_width: usize,
    pub fallback_window_bars: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        use constants::*;
        Self {
            adx_period: momentum::ADX_PERIOD,
            adx_min: momentum::ADX_THRESHOLD,
            keltner_period: channel::KELTNER_PERIOD,
            band_mult: channel::BAND_MULT,
            clean_approach_bars: channel::CLEAN_APPROACH_BARS,
            rsi_period: tdi::RSI_PERIOD,
            tdi_fast: tdi::FAST_SMOOTH,
            tdi_slow: tdi::SLOW_SMOOTH,
            bollinger_period: bands::PERIOD,
            bollinger_mult: bands::MULT,
            primary_lookback: swing::PRIMARY_LOOKBACK,
            secondary_lookback: swing::SECONDARY_LOOKBACK,
            pressure_low: pressure::LOW_ZONE,
            pressure_high: pressure::HIGH_ZONE,
            volume_fast: volume_filter::FAST_PERIOD,
            volume_slow: volume_filter::SLOW_PERIOD,
            structure_width: structure::CONFIRM_WIDTH,
            fallback_window_bars: signal::FALLBACK_WINDOW_BARS,
        }
    }
}

/// How many candles each stage asks the adapter for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FetchPlan {
    pub pattern_bars: usize,
    pub momentum_bars: usize,
    pub pullback_bars: usize,
    pub execution_bars: usize,
    pub structure_bars: usize,
}

impl Default for FetchPlan {
    fn default() -> Self {
        use constants::fetch;
        Self {
            pattern_bars: fetch::PATTERN_BARS,
            momentum_bars: fetch::MOMENTUM_BARS,
            pullback_bars: fetch::PULLBACK_BARS,
            execution_bars: fetch::EXECUTION_BARS,
            structure_bars: fetch::STRUCTURE_BARS,
        }
    }
}

/// Per-fetch retry behaviour. Exhaustion degrades to "no data", never an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: constants::fetch::ATTEMPTS,
            backoff_base_ms: constants::fetch::BACKOFF_BASE_MS,
        }
    }
}

/// The master scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub mode: ScanMode,
    pub timeframes: TimeframePlan,
    pub thresholds: Thresholds,
    pub fetch: FetchPlan,
    pub retry: RetryPolicy,

    /// Admission gate: simultaneously in-flight fetches across the whole run.
    pub max_concurrent_fetches: usize,

    /// Anchor pivots older than this many pattern-timeframe bars are discarded
    /// at Stage 1 before any further fetch.
    pub max_anchor_age_bars: usize,
}

impl ScanConfig {
    pub fn for_mode(mode: ScanMode) -> Self {
        let (timeframes, max_anchor_age_bars) = match mode {
            ScanMode::Intraday => (
                TimeframePlan {
                    pattern: Timeframe::H4,
                    momentum: Timeframe::H1,
                    pullback: Timeframe::M30,
                    execution: Timeframe::M15,
                    structure: Timeframe::H1,
                },
                30,
            ),
            ScanMode::Swing => (
                TimeframePlan {
                    pattern: Timeframe::D1,
                    momentum: Timeframe::H4,
                    pullback: Timeframe::H2,
                    execution: Timeframe::H1,
                    structure: Timeframe::H4,
                },
                21,
            ),
            ScanMode::Position => (
                TimeframePlan {
                    pattern: Timeframe::W1,
                    momentum: Timeframe::D1,
                    pullback: Timeframe::H4,
                    execution: Timeframe::H2,
                    structure: Timeframe::D1,
                },
                12,
            ),
        };

        Self {
            mode,
            timeframes,
            thresholds: Thresholds::default(),
            fetch: FetchPlan::default(),
            retry: RetryPolicy::default(),
            max_concurrent_fetches: constants::MAX_CONCURRENT_FETCHES,
            max_anchor_age_bars,
        }
    }

    /// Age ceiling for the anchor pivot, in milliseconds.
    pub fn anchor_age_ceiling_ms(&self) -> i64 {
        self.max_anchor_age_bars as i64 * self.timeframes.pattern.ms()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::for_mode(ScanMode::default())
    }
}
