//! Series smoothing primitives. Every function returns a vector aligned 1:1
//! with its input; the undefined leading prefix is NaN. Inputs may themselves
//! carry a NaN prefix (RSI-of-smoothed pipelines), so each smoother anchors
//! on the first finite value.

/// Index of the first finite value, or None when the series is all-NaN/empty.
pub(crate) fn first_finite(series: &[f64]) -> Option<usize> {
    series.iter().position(|v| v.is_finite())
}

/// Wilder-style recursive smoothing with factor 1/period.
/// Seeded with the arithmetic mean of the first `period` defined points.
pub fn running_average(series: &[f64], period: usize) -> Vec<f64> {
    let len = series.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 {
        return out;
    }
    let Some(start) = first_finite(series) else {
        return out;
    };
    if len - start < period {
        return out;
    }

    let seed_idx = start + period - 1;
    let seed = series[start..=seed_idx].iter().sum::<f64>() / period as f64;
    out[seed_idx] = seed;

    let mut prev = seed;
    for i in (seed_idx + 1)..len {
        prev += (series[i] - prev) / period as f64;
        out[i] = prev;
    }
    out
}

/// Trailing arithmetic mean over exactly `period` points.
pub fn simple_average(series: &[f64], period: usize) -> Vec<f64> {
    let len = series.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 {
        return out;
    }
    let Some(start) = first_finite(series) else {
        return out;
    };
    if len - start < period {
        return out;
    }

    // Rolling sum, O(1) per step
    let mut rolling: f64 = series[start..start + period].iter().sum();
    out[start + period - 1] = rolling / period as f64;
    for i in (start + period)..len {
        rolling += series[i] - series[i - period];
        out[i] = rolling / period as f64;
    }
    out
}

/// Standard exponential weighting (alpha = 2/(period+1)), seeded from the
/// first defined value, so defined from that point onward.
pub fn exponential_average(series: &[f64], period: usize) -> Vec<f64> {
    let len = series.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 {
        return out;
    }
    let Some(start) = first_finite(series) else {
        return out;
    };

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = series[start];
    out[start] = prev;
    for i in (start + 1)..len {
        prev = alpha * series[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Trailing population standard deviation over exactly `period` points.
pub fn rolling_stddev(series: &[f64], period: usize) -> Vec<f64> {
    let len = series.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 {
        return out;
    }
    let Some(start) = first_finite(series) else {
        return out;
    };
    if len - start < period {
        return out;
    }

    for i in (start + period - 1)..len {
        let window = &series[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f64>()
            / period as f64;
        out[i] = variance.sqrt();
    }
    out
}
