//! Indicator library: pure functions of OHLCV slices returning aligned
//! derived series (NaN until enough history accumulates).

use crate::analysis::smoothing::{running_average, rolling_stddev, simple_average};
use crate::domain::Direction;

const ZERO_LOSS_EPSILON: f64 = 1e-12;

/// RSI from running-averaged gains/losses.
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let len = close.len();
    let mut gains = vec![f64::NAN; len];
    let mut losses = vec![f64::NAN; len];
    for i in 1..len {
        let change = close[i] - close[i - 1];
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }

    let avg_gain = running_average(&gains, period);
    let avg_loss = running_average(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(gain, loss)| {
            if gain.is_nan() || loss.is_nan() {
                f64::NAN
            } else if *loss < ZERO_LOSS_EPSILON {
                // Zero-loss run guard
                100.0
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

/// True range per bar; the first bar falls back to high-low.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let len = close.len();
    let mut tr = vec![f64::NAN; len];
    if len == 0 {
        return tr;
    }
    tr[0] = high[0] - low[0];
    for i in 1..len {
        let high_low = high[i] - low[i];
        let high_close = (high[i] - close[i - 1]).abs();
        let low_close = (low[i] - close[i - 1]).abs();
        tr[i] = high_low.max(high_close).max(low_close);
    }
    tr
}

/// ATR: running average of true range.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    running_average(&true_range(high, low, close), period)
}

/// Basis plus symmetric envelope; shared shape for Keltner and Bollinger.
#[derive(Debug, Clone)]
pub struct Channel {
    pub basis: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

impl Channel {
    fn from_basis_and_width(basis: Vec<f64>, width: &[f64], mult: f64) -> Self {
        let upper = basis
            .iter()
            .zip(width)
            .map(|(b, w)| b + mult * w)
            .collect();
        let lower = basis
            .iter()
            .zip(width)
            .map(|(b, w)| b - mult * w)
            .collect();
        Self { basis, upper, lower }
    }
}

/// Keltner Channel: SMA basis, ATR envelope.
pub fn keltner_channel(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
    mult: f64,
) -> Channel {
    let basis = simple_average(close, period);
    let width = atr(high, low, close, period);
    Channel::from_basis_and_width(basis, &width, mult)
}

/// Bollinger bands: SMA basis, stddev envelope.
pub fn bollinger_bands(close: &[f64], period: usize, mult: f64) -> Channel {
    let basis = simple_average(close, period);
    let width = rolling_stddev(close, period);
    Channel::from_basis_and_width(basis, &width, mult)
}

/// ADX from Wilder-smoothed directional movement. Undefined for roughly the
/// first 2×period bars (DI smoothing, then DX re-smoothing).
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let len = close.len();
    let mut plus_dm = vec![f64::NAN; len];
    let mut minus_dm = vec![f64::NAN; len];
    for i in 1..len {
        let up_move = high[i] - high[i - 1];
        let down_move = low[i - 1] - low[i];
        plus_dm[i] = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        minus_dm[i] = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
    }

    let mut tr = true_range(high, low, close);
    if !tr.is_empty() {
        // Align TR with the DM series so all three smoothers seed together
        tr[0] = f64::NAN;
    }

    let smoothed_tr = running_average(&tr, period);
    let smoothed_plus = running_average(&plus_dm, period);
    let smoothed_minus = running_average(&minus_dm, period);

    let mut dx = vec![f64::NAN; len];
    for i in 0..len {
        let (t, p, m) = (smoothed_tr[i], smoothed_plus[i], smoothed_minus[i]);
        if t.is_nan() || p.is_nan() || m.is_nan() {
            continue;
        }
        if t.abs() < f64::EPSILON {
            dx[i] = 0.0;
            continue;
        }
        let plus_di = 100.0 * p / t;
        let minus_di = 100.0 * m / t;
        let di_sum = plus_di + minus_di;
        dx[i] = if di_sum.abs() < f64::EPSILON {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };
    }

    running_average(&dx, period)
}

/// Fast/slow smoothed-RSI pair (TDI style).
#[derive(Debug, Clone)]
pub struct TdiLines {
    pub fast: Vec<f64>,
    pub slow: Vec<f64>,
}

pub fn tdi_lines(close: &[f64], rsi_period: usize, fast: usize, slow: usize) -> TdiLines {
    let base = rsi(close, rsi_period);
    TdiLines {
        fast: simple_average(&base, fast),
        slow: simple_average(&base, slow),
    }
}

/// Latest-bar fast-vs-slow comparison; None while either line is undefined.
pub fn tdi_state(lines: &TdiLines) -> Option<Direction> {
    let fast = *lines.fast.last()?;
    let slow = *lines.slow.last()?;
    if fast.is_nan() || slow.is_nan() {
        return None;
    }
    if fast > slow {
        Some(Direction::Long)
    } else {
        Some(Direction::Short)
    }
}
