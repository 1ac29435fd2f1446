//! Composite pressure oscillator and its rising-edge extreme-zone events.

use crate::analysis::indicators::rsi;
use crate::analysis::smoothing::{rolling_stddev, running_average, simple_average};
use crate::analysis::swing::SwingSeries;
use crate::domain::{CandleSeries, Direction};

const FLOW_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct PressureParams {
    pub deviation_period: usize,
    pub flow_period: usize,
    pub rsi_period: usize,
    pub smooth_period: usize,
}

impl Default for PressureParams {
    fn default() -> Self {
        use crate::config::constants::pressure;
        Self {
            deviation_period: pressure::DEVIATION_PERIOD,
            flow_period: pressure::FLOW_PERIOD,
            rsi_period: pressure::RSI_PERIOD,
            smooth_period: pressure::SMOOTH_PERIOD,
        }
    }
}

/// Composite of a deviation-normalized price oscillator, a volume-weighted
/// flow ratio and RSI-of-typical-price, averaged and re-smoothed into one
/// roughly 0..100 series.
pub fn pressure_oscillator(series: &CandleSeries, params: &PressureParams) -> Vec<f64> {
    let typical = series.typical_prices();
    let len = typical.len();

    let deviation = deviation_oscillator(&typical, params.deviation_period);
    let flow = flow_ratio(&typical, &series.base_asset_volumes, params.flow_period);
    let momentum = rsi(&typical, params.rsi_period);

    let mut composite = vec![f64::NAN; len];
    for i in 0..len {
        let (d, f, m) = (deviation[i], flow[i], momentum[i]);
        if d.is_finite() && f.is_finite() && m.is_finite() {
            composite[i] = (d + f + m) / 3.0;
        }
    }

    running_average(&composite, params.smooth_period)
}

/// Z-score of typical price vs its own SMA, mapped around 50 and clamped.
fn deviation_oscillator(typical: &[f64], period: usize) -> Vec<f64> {
    let basis = simple_average(typical, period);
    let spread = rolling_stddev(typical, period);

    typical
        .iter()
        .zip(basis.iter().zip(&spread))
        .map(|(tp, (b, s))| {
            if b.is_nan() || s.is_nan() {
                f64::NAN
            } else if *s < f64::EPSILON {
                50.0
            } else {
                (50.0 + 25.0 * (tp - b) / s).clamp(0.0, 100.0)
            }
        })
        .collect()
}

/// Money-flow style ratio: share of volume-weighted flow on up-bars over a
/// trailing window, 0..100.
fn flow_ratio(typical: &[f64], volume: &[f64], period: usize) -> Vec<f64> {
    let len = typical.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len < 2 {
        return out;
    }

    let mut up_flow = vec![0.0; len];
    let mut down_flow = vec![0.0; len];
    for i in 1..len {
        let raw = typical[i] * volume[i];
        if typical[i] > typical[i - 1] {
            up_flow[i] = raw;
        } else if typical[i] < typical[i - 1] {
            down_flow[i] = raw;
        }
    }

    for i in period..len {
        let pos: f64 = up_flow[i + 1 - period..=i].iter().sum();
        let neg: f64 = down_flow[i + 1 - period..=i].iter().sum();
        let total = pos + neg;
        out[i] = if total < FLOW_EPSILON {
            50.0
        } else {
            100.0 * pos / total
        };
    }
    out
}

/// Per-bar rising-edge events: the oscillator enters the extreme zone
/// (oversold for long, overbought for short) while the primary swing agrees
/// and price sits on the correct side of the primary trailing stop.
pub fn pressure_events(
    osc: &[f64],
    primary: &SwingSeries,
    close: &[f64],
    direction: Direction,
    low_zone: f64,
    high_zone: f64,
) -> Vec<bool> {
    let len = osc.len();
    let mut events = vec![false; len];

    let in_zone = |v: f64| -> bool {
        match direction {
            Direction::Long => v <= low_zone,
            Direction::Short => v >= high_zone,
        }
    };

    for i in 1..len {
        if !osc[i].is_finite() || !osc[i - 1].is_finite() {
            continue;
        }
        let entered = in_zone(osc[i]) && !in_zone(osc[i - 1]);
        if !entered {
            continue;
        }

        let trend_agrees = primary.direction[i] == direction.sign();
        let stop = primary.stop[i];
        let price_agrees = stop.is_finite()
            && match direction {
                Direction::Long => close[i] > stop,
                Direction::Short => close[i] < stop,
            };

        events[i] = trend_agrees && price_agrees;
    }
    events
}
