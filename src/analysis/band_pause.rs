//! Band-pause continuation detector: a Bollinger-band state machine that
//! spots an over-extension, the band break, the retest, and finally the
//! basis cross that confirms trend continuation. One forward pass in strict
//! time order; re-armable, so several emissions per series are normal.

use crate::analysis::indicators::{Channel, bollinger_bands};
use crate::domain::{CandleSeries, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PauseState {
    Idle,
    Extended,
    Broken,
    Armed,
}

/// Emission timestamps for one direction. Evaluates each closed bar once;
/// at most one state transition per bar.
pub fn continuation_signals(
    series: &CandleSeries,
    direction: Direction,
    period: usize,
    mult: f64,
) -> Vec<i64> {
    let bands = bollinger_bands(&series.close_prices, period, mult);
    continuation_signals_with_bands(series, &bands, direction)
}

fn continuation_signals_with_bands(
    series: &CandleSeries,
    bands: &Channel,
    direction: Direction,
) -> Vec<i64> {
    let mut emissions = Vec::new();
    let mut state = PauseState::Idle;

    for i in 0..series.len() {
        let (basis, upper, lower) = (bands.basis[i], bands.upper[i], bands.lower[i]);
        if basis.is_nan() || upper.is_nan() || lower.is_nan() {
            continue;
        }

        let high = series.high_prices[i];
        let low = series.low_prices[i];
        let close = series.close_prices[i];

        // Mirrored reads: for the short side "outside" means below the lower
        // band, and the opposite extreme is above the upper band.
        let (whole_bar_outside, closed_outside, retested_band, crossed_basis, opposite_extreme) =
            match direction {
                Direction::Short => (
                    high < lower,
                    close < lower,
                    high > lower,
                    close < basis,
                    low > upper,
                ),
                Direction::Long => (
                    low > upper,
                    close > upper,
                    low < upper,
                    close > basis,
                    high < lower,
                ),
            };

        // A full bar beyond the opposite band abandons the setup outright
        if opposite_extreme {
            state = PauseState::Idle;
            continue;
        }

        state = match state {
            PauseState::Idle if whole_bar_outside => PauseState::Extended,
            PauseState::Extended if closed_outside => PauseState::Broken,
            PauseState::Broken if retested_band => PauseState::Armed,
            PauseState::Armed if crossed_basis => {
                emissions.push(series.timestamps[i]);
                PauseState::Idle
            }
            unchanged => unchanged,
        };
    }

    emissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, Timeframe};

    const TS_STEP: i64 = 3_600_000;
    const PERIOD: usize = 20;
    const MULT: f64 = 2.0;

    fn candle(i: usize, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(i as i64 * TS_STEP, o, h, l, c, 10.0, 1000.0)
    }

    /// Alternating-close baseline around 100 keeps the ±2-sigma band near
    /// [97.8, 102.2] once warmed up.
    fn baseline_bar(i: usize) -> (f64, f64, f64, f64) {
        let c = if i % 2 == 0 { 99.0 } else { 101.0 };
        (100.0, c + 0.5, c - 0.5, c)
    }

    /// Short-side script (band-relative positions hand-checked against the
    /// rolling-band values): whole bar below the lower band at 30, band
    /// break close at 32, retest at 35, basis cross at 38.
    fn short_script_bar(i: usize) -> (f64, f64, f64, f64) {
        match i {
            30 => (96.5, 96.7, 94.5, 95.0),
            31 => (95.5, 97.5, 95.0, 97.0),
            32 => (95.0, 95.5, 92.5, 93.0),
            33 => (93.0, 93.5, 92.5, 93.0),
            34 => (92.3, 92.5, 91.5, 92.0),
            35 => (93.0, 96.5, 92.9, 95.5),
            36 => (95.5, 100.0, 95.4, 99.5),
            37 => (99.5, 101.0, 99.0, 100.5),
            38 => (100.0, 100.5, 96.0, 96.5),
            _ => baseline_bar(i),
        }
    }

    fn series_from(script: impl Fn(usize) -> (f64, f64, f64, f64), n: usize) -> CandleSeries {
        let candles: Vec<Candle> = (0..n)
            .map(|i| {
                let (o, h, l, c) = script(i);
                candle(i, o, h, l, c)
            })
            .collect();
        CandleSeries::from_candles(Timeframe::H1, &candles)
    }

    /// Extension, break, retest, basis cross: exactly one emission at the
    /// basis-cross bar, then the machine is Idle again.
    #[test]
    fn short_side_script_emits_once_at_the_basis_cross() {
        let series = series_from(short_script_bar, 50);
        let signals = continuation_signals(&series, Direction::Short, PERIOD, MULT);
        assert_eq!(signals, vec![38 * TS_STEP]);
    }

    #[test]
    fn detector_is_idempotent_on_unchanged_input() {
        let series = series_from(short_script_bar, 50);
        let first = continuation_signals(&series, Direction::Short, PERIOD, MULT);
        let second = continuation_signals(&series, Direction::Short, PERIOD, MULT);
        assert_eq!(first, second);
    }

    #[test]
    fn opposite_extreme_resets_the_machine() {
        // Same script, but a full bar above the upper band lands between the
        // break and the retest and must abandon the sequence.
        let script = |i: usize| {
            if i == 33 {
                (108.0, 110.0, 107.5, 108.5)
            } else {
                short_script_bar(i)
            }
        };
        let series = series_from(script, 50);
        let signals = continuation_signals(&series, Direction::Short, PERIOD, MULT);
        assert!(
            signals.is_empty(),
            "reset bar must clear the sequence: {signals:?}"
        );
    }

    #[test]
    fn long_side_mirrors_the_short_script() {
        // Mirror every price around 100; high/low swap roles
        let script = |i: usize| {
            let (o, h, l, c) = short_script_bar(i);
            (200.0 - o, 200.0 - l, 200.0 - h, 200.0 - c)
        };
        let series = series_from(script, 50);
        let signals = continuation_signals(&series, Direction::Long, PERIOD, MULT);
        assert_eq!(signals, vec![38 * TS_STEP]);
    }

    #[test]
    fn machine_rearms_for_later_sequences() {
        // Two copies of the dip block, forty bars apart
        let script = |i: usize| {
            if (30..=38).contains(&i) {
                short_script_bar(i)
            } else if (70..=78).contains(&i) {
                short_script_bar(i - 40)
            } else {
                baseline_bar(i)
            }
        };
        let series = series_from(script, 90);
        let signals = continuation_signals(&series, Direction::Short, PERIOD, MULT);
        assert_eq!(signals, vec![38 * TS_STEP, 78 * TS_STEP]);
    }
}
