//! Final-signal detector: a pressure event arms a pending pointer, and a
//! secondary-swing crossover in the trade direction cashes it in, provided
//! the volume filter passes and price still sits on the right side of the
//! primary trend.

use crate::analysis::pressure::{PressureParams, pressure_events, pressure_oscillator};
use crate::analysis::smoothing::simple_average;
use crate::analysis::swing::{SwingSeries, swing_trend};
use crate::config::Thresholds;
use crate::domain::{CandleSeries, Direction};

/// One emission: bar index plus its open timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalBar {
    pub index: usize,
    pub timestamp_ms: i64,
}

/// Both directions plus bar offsets from the series end, for diagnostics.
#[derive(Debug, Clone)]
pub struct SignalDebug {
    pub long: Vec<SignalBar>,
    pub short: Vec<SignalBar>,
    pub long_offsets: Vec<usize>,
    pub short_offsets: Vec<usize>,
}

/// Collects every emission inside the caller's window: at/after `anchor_ts`
/// when given, else within the trailing fallback window. One anchor can
/// legitimately produce several downstream signals, so all of them are
/// returned, ascending.
pub fn final_signals(
    series: &CandleSeries,
    direction: Direction,
    anchor_ts: Option<i64>,
    th: &Thresholds,
) -> (bool, Vec<i64>) {
    let all = scan_direction(series, direction, th);

    let cutoff_ts = match anchor_ts {
        Some(ts) => ts,
        None => {
            let last_idx = series.len().saturating_sub(1);
            let first_idx = last_idx.saturating_sub(th.fallback_window_bars);
            series.timestamps.get(first_idx).copied().unwrap_or(i64::MIN)
        }
    };

    let hits: Vec<i64> = all
        .into_iter()
        .filter(|s| s.timestamp_ms >= cutoff_ts)
        .map(|s| s.timestamp_ms)
        .collect();
    (!hits.is_empty(), hits)
}

/// Debug variant: evaluates both directions over the whole series and also
/// reports how many bars back each emission sits.
pub fn final_signals_debug(series: &CandleSeries, th: &Thresholds) -> SignalDebug {
    let last = series.len().saturating_sub(1);
    let long = scan_direction(series, Direction::Long, th);
    let short = scan_direction(series, Direction::Short, th);
    let long_offsets = long.iter().map(|s| last - s.index).collect();
    let short_offsets = short.iter().map(|s| last - s.index).collect();
    SignalDebug {
        long,
        short,
        long_offsets,
        short_offsets,
    }
}

fn scan_direction(series: &CandleSeries, direction: Direction, th: &Thresholds) -> Vec<SignalBar> {
    let close = &series.close_prices;
    let primary = swing_trend(
        &series.high_prices,
        &series.low_prices,
        close,
        th.primary_lookback,
    );
    let secondary = swing_trend(
        &series.high_prices,
        &series.low_prices,
        close,
        th.secondary_lookback,
    );
    let osc = pressure_oscillator(series, &PressureParams::default());
    let events = pressure_events(
        &osc,
        &primary,
        close,
        direction,
        th.pressure_low,
        th.pressure_high,
    );
    let vol_fast = simple_average(&series.base_asset_volumes, th.volume_fast);
    let vol_slow = simple_average(&series.base_asset_volumes, th.volume_slow);

    emit_signals(
        series, direction, &primary, &secondary, &events, &vol_fast, &vol_slow,
    )
}

/// The pointer lifecycle. Two reset rules evolved separately in practice and
/// both are kept: a primary-trend flip clears the pointer, and a matching
/// crossover consumes it even when the remaining filters reject the bar.
fn emit_signals(
    series: &CandleSeries,
    direction: Direction,
    primary: &SwingSeries,
    secondary: &SwingSeries,
    events: &[bool],
    vol_fast: &[f64],
    vol_slow: &[f64],
) -> Vec<SignalBar> {
    let len = series.len();
    let sign = direction.sign();
    let close = &series.close_prices;

    let mut signals = Vec::new();
    let mut pending: Option<usize> = None;

    for i in 1..len {
        if events[i] {
            pending = Some(i);
        }

        // A primary trend flip invalidates whatever armed the pointer
        let flipped = primary.direction[i] != 0
            && primary.direction[i - 1] != 0
            && primary.direction[i] != primary.direction[i - 1];
        if flipped {
            pending = None;
        }

        let crossed = secondary.direction[i] == sign && secondary.direction[i - 1] != sign;
        if !crossed || pending.is_none() {
            continue;
        }

        let volume_ok =
            vol_fast[i].is_finite() && vol_slow[i].is_finite() && vol_fast[i] > vol_slow[i];
        let stop = primary.stop[i];
        let price_ok = stop.is_finite()
            && match direction {
                Direction::Long => close[i] > stop,
                Direction::Short => close[i] < stop,
            };
        let trend_ok = primary.direction[i] == sign;

        if volume_ok && price_ok && trend_ok {
            signals.push(SignalBar {
                index: i,
                timestamp_ms: series.timestamps[i],
            });
        }
        // The crossover consumes the pointer whether or not it fired
        pending = None;
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;

    const TS_STEP: i64 = 3_600_000;

    fn series(close: &[f64], volume: &[f64]) -> CandleSeries {
        let candles: Vec<crate::domain::Candle> = close
            .iter()
            .zip(volume)
            .enumerate()
            .map(|(i, (c, v))| {
                crate::domain::Candle::new(i as i64 * TS_STEP, *c, c + 0.5, c - 0.5, *c, *v, c * v)
            })
            .collect();
        CandleSeries::from_candles(Timeframe::H1, &candles)
    }

    fn flat_swing(len: usize, dir: i8, stop: f64) -> SwingSeries {
        SwingSeries {
            direction: vec![dir; len],
            stop: vec![stop; len],
        }
    }

    #[test]
    fn crossover_with_pending_and_filters_emits() {
        let n = 12;
        let close = vec![100.0; n];
        let volume = vec![10.0; n];
        let s = series(&close, &volume);

        let primary = flat_swing(n, 1, 90.0);
        let mut secondary = flat_swing(n, -1, 110.0);
        for i in 8..n {
            secondary.direction[i] = 1; // crossover at bar 8
        }
        let mut events = vec![false; n];
        events[5] = true;

        let vol_fast = vec![2.0; n];
        let vol_slow = vec![1.0; n];

        let out = emit_signals(
            &s,
            Direction::Long,
            &primary,
            &secondary,
            &events,
            &vol_fast,
            &vol_slow,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].index, 8);
    }

    #[test]
    fn primary_flip_clears_the_pending_pointer() {
        let n = 12;
        let close = vec![100.0; n];
        let volume = vec![10.0; n];
        let s = series(&close, &volume);

        let mut primary = flat_swing(n, 1, 90.0);
        for i in 7..n {
            primary.direction[i] = -1; // trend flips at 7, before the cross
            primary.stop[i] = 110.0;
        }
        let mut secondary = flat_swing(n, -1, 110.0);
        for i in 9..n {
            secondary.direction[i] = 1;
        }
        let mut events = vec![false; n];
        events[5] = true;

        let out = emit_signals(
            &s,
            Direction::Long,
            &primary,
            &secondary,
            &events,
            &vec![2.0; n],
            &vec![1.0; n],
        );
        assert!(out.is_empty(), "flip must disarm: {out:?}");
    }

    #[test]
    fn failed_filter_cross_still_consumes_the_pointer() {
        let n = 16;
        let close = vec![100.0; n];
        let volume = vec![10.0; n];
        let s = series(&close, &volume);

        let primary = flat_swing(n, 1, 90.0);
        let mut secondary = flat_swing(n, -1, 110.0);
        for i in 8..n {
            secondary.direction[i] = 1;
        }
        // Volume filter fails on the crossover bar, passes later
        let mut vol_fast = vec![0.5; n];
        for i in 10..n {
            vol_fast[i] = 2.0;
        }
        let mut events = vec![false; n];
        events[5] = true;

        let out = emit_signals(
            &s,
            Direction::Long,
            &primary,
            &secondary,
            &events,
            &vol_fast,
            &vec![1.0; n],
        );
        // The failed cross at bar 8 consumed the pointer; no later emission
        // without a fresh pressure event.
        assert!(out.is_empty(), "pointer must be consumed: {out:?}");
    }

    #[test]
    fn each_emission_requires_a_fresh_arm() {
        let n = 24;
        let close = vec![100.0; n];
        let volume = vec![10.0; n];
        let s = series(&close, &volume);

        let primary = flat_swing(n, 1, 90.0);
        let mut secondary = flat_swing(n, -1, 110.0);
        // Two separate crossovers: bars 8 and 18 (dropping out in between)
        for i in 8..12 {
            secondary.direction[i] = 1;
        }
        for i in 18..n {
            secondary.direction[i] = 1;
        }
        let mut events = vec![false; n];
        events[5] = true;
        events[15] = true;

        let out = emit_signals(
            &s,
            Direction::Long,
            &primary,
            &secondary,
            &events,
            &vec![2.0; n],
            &vec![1.0; n],
        );
        let indices: Vec<usize> = out.iter().map(|sb| sb.index).collect();
        assert_eq!(indices, vec![8, 18]);
    }

    #[test]
    fn future_anchor_yields_no_hits() {
        let n = 120;
        let close: Vec<f64> = (0..n).map(|i| 100.0 + (i % 3) as f64).collect();
        let volume = vec![10.0; n];
        let s = series(&close, &volume);
        let th = Thresholds::default();

        // An anchor beyond the last bar excludes every possible emission.
        let far = n as i64 * TS_STEP + TS_STEP;
        let (hit, ts) = final_signals(&s, Direction::Long, Some(far), &th);
        assert!(!hit);
        assert!(ts.is_empty());
    }

    #[test]
    fn debug_offsets_count_back_from_series_end() {
        let n = 120;
        let close: Vec<f64> = (0..n).map(|i| 100.0 + (i % 5) as f64).collect();
        let volume = vec![10.0; n];
        let s = series(&close, &volume);
        let th = Thresholds::default();

        let dbg = final_signals_debug(&s, &th);
        for (sb, off) in dbg.long.iter().zip(&dbg.long_offsets) {
            assert_eq!(sb.index + off, n - 1);
        }
        for (sb, off) in dbg.short.iter().zip(&dbg.short_offsets) {
            assert_eq!(sb.index + off, n - 1);
        }
    }
}
