//! Two-lookback swing-trend detector: rolling breakout against the trailing
//! high/low, with the last breakout direction carried forward until the
//! opposite breakout occurs.

/// Per-bar swing label and trailing-stop level at one lookback.
/// `direction`: +1 bullish, -1 bearish, 0 before the first breakout.
#[derive(Debug, Clone)]
pub struct SwingSeries {
    pub direction: Vec<i8>,
    pub stop: Vec<f64>,
}

impl SwingSeries {
    pub fn len(&self) -> usize {
        self.direction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direction.is_empty()
    }

    /// Latest bar's direction.
    pub fn last_direction(&self) -> i8 {
        self.direction.last().copied().unwrap_or(0)
    }
}

/// One forward pass. A bar breaks up when its close exceeds the trailing
/// rolling high over `lookback` bars (current bar excluded), breaks down when
/// its close undercuts the trailing rolling low. The state forward-fills and
/// never flickers inside a confirmed run. The trailing stop is the rolling
/// low under a bullish state and the rolling high under a bearish one.
pub fn swing_trend(high: &[f64], low: &[f64], close: &[f64], lookback: usize) -> SwingSeries {
    let len = close.len();
    let mut direction = vec![0i8; len];
    let mut stop = vec![f64::NAN; len];
    if lookback == 0 || len == 0 {
        return SwingSeries { direction, stop };
    }

    let mut state: i8 = 0;
    for i in lookback..len {
        let window_high = high[i - lookback..i]
            .iter()
            .copied()
            .fold(f64::MIN, f64::max);
        let window_low = low[i - lookback..i].iter().copied().fold(f64::MAX, f64::min);

        if close[i] > window_high {
            state = 1;
        } else if close[i] < window_low {
            state = -1;
        }

        direction[i] = state;
        stop[i] = match state {
            1 => window_low,
            -1 => window_high,
            _ => f64::NAN,
        };
    }

    SwingSeries { direction, stop }
}
