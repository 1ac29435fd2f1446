//! Numeric defaults for the scan pipeline (immutable blueprints).

// Top level constants
pub const MAX_CONCURRENT_FETCHES: usize = 8;

pub mod momentum {
    pub const ADX_PERIOD: usize = 14;
    pub const ADX_THRESHOLD: f64 = 20.0;
}

pub mod channel {
    pub const KELTNER_PERIOD: usize = 20;
    pub const BAND_MULT: f64 = 2.0;
    // Closed bars that must stay on the correct side of the channel (Stage 2)
    pub const CLEAN_APPROACH_BARS: usize = 5;
}

pub mod tdi {
    pub const RSI_PERIOD: usize = 13;
    pub const FAST_SMOOTH: usize = 2;
    pub const SLOW_SMOOTH: usize = 7;
}

pub mod swing {
    pub const PRIMARY_LOOKBACK: usize = 50;
    pub const SECONDARY_LOOKBACK: usize = 21;
}

pub mod pressure {
    pub const DEVIATION_PERIOD: usize = 20;
    pub const FLOW_PERIOD: usize = 14;
    pub const RSI_PERIOD: usize = 14;
    pub const SMOOTH_PERIOD: usize = 3;
    pub const LOW_ZONE: f64 = 25.0;
    pub const HIGH_ZONE: f64 = 75.0;
}

pub mod volume_filter {
    pub const FAST_PERIOD: usize = 7;
    pub const SLOW_PERIOD: usize = 21;
}

pub mod bands {
    pub const PERIOD: usize = 20;
    pub const MULT: f64 = 2.0;
}

pub mod structure {
    // Bars on each side a local extreme needs before it counts as confirmed.
    // Observed behaviour is a fixed width; kept as a config default, not an invariant.
    pub const CONFIRM_WIDTH: usize = 5;
}

pub mod signal {
    // Trailing window (execution-timeframe bars) when a caller gives no anchor
    pub const FALLBACK_WINDOW_BARS: usize = 50;
}

pub mod fetch {
    pub const ATTEMPTS: u32 = 3;
    pub const BACKOFF_BASE_MS: u64 = 500;

    pub const PATTERN_BARS: usize = 64;
    pub const MOMENTUM_BARS: usize = 300;
    pub const PULLBACK_BARS: usize = 300;
    pub const EXECUTION_BARS: usize = 400;
    pub const STRUCTURE_BARS: usize = 400;
}
