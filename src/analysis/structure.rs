//! Structural break detection. Confirmed local extrema become levels; a
//! later close through a still-unbroken level emits a timestamped event,
//! classified as a break (continuation) or a reversal (change of character)
//! depending on the side of the previous emission.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::domain::{CandleSeries, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StructuralKind {
    #[strum(serialize = "bull break")]
    BullBreak,
    #[strum(serialize = "bull reversal")]
    BullReversal,
    #[strum(serialize = "bear break")]
    BearBreak,
    #[strum(serialize = "bear reversal")]
    BearReversal,
}

impl StructuralKind {
    pub fn is_bullish(self) -> bool {
        matches!(self, Self::BullBreak | Self::BullReversal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralEvent {
    pub timestamp_ms: i64,
    pub kind: StructuralKind,
}

/// How a signal timestamp relates to the surrounding structure. Ordering
/// matters: a better rank supersedes a worse one when several signal
/// timestamps are validated against the same event list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ValidationRank {
    #[strum(serialize = "invalid")]
    Invalid,
    #[strum(serialize = "waiting")]
    Waiting,
    #[strum(serialize = "valid")]
    Valid,
}

/// Single forward pass. A bar at `i - width` is a confirmed local high when
/// its high strictly exceeds every high within `width` bars on both sides;
/// symmetric for lows. The most recent confirmed level on each side stays
/// live until a close trades through it, which emits exactly one event and
/// retires the level until a new extremum confirms.
pub fn structural_events(series: &CandleSeries, width: usize) -> Vec<StructuralEvent> {
    let n = series.len();
    if width == 0 || n < 2 * width + 1 {
        return Vec::new();
    }
    let high = &series.high_prices;
    let low = &series.low_prices;
    let close = &series.close_prices;

    let mut events: Vec<StructuralEvent> = Vec::new();
    let mut last_bullish: Option<bool> = None;
    let mut live_high: Option<f64> = None;
    let mut live_low: Option<f64> = None;

    for i in 2 * width..n {
        let p = i - width;
        if (p - width..p).all(|j| high[j] < high[p]) && (p + 1..=i).all(|j| high[j] < high[p]) {
            live_high = Some(high[p]);
        }
        if (p - width..p).all(|j| low[j] > low[p]) && (p + 1..=i).all(|j| low[j] > low[p]) {
            live_low = Some(low[p]);
        }

        if let Some(level) = live_high
            && close[i] > level
        {
            let kind = if last_bullish == Some(false) {
                StructuralKind::BullReversal
            } else {
                StructuralKind::BullBreak
            };
            events.push(StructuralEvent {
                timestamp_ms: series.timestamps[i],
                kind,
            });
            last_bullish = Some(true);
            live_high = None;
        }
        if let Some(level) = live_low
            && close[i] < level
        {
            let kind = if last_bullish == Some(true) {
                StructuralKind::BearReversal
            } else {
                StructuralKind::BearBreak
            };
            events.push(StructuralEvent {
                timestamp_ms: series.timestamps[i],
                kind,
            });
            last_bullish = Some(false);
            live_low = None;
        }
    }

    events
}

/// Ranks one signal timestamp against the event list. The last event before
/// the signal or the first event at/after it being the matching reversal
/// type makes the signal valid; the first event after it being the opposing
/// plain break invalidates it; anything else is still waiting on structure.
pub fn validate(events: &[StructuralEvent], signal_ts: i64, direction: Direction) -> ValidationRank {
    let (matching, blocking) = match direction {
        Direction::Long => (StructuralKind::BullReversal, StructuralKind::BearBreak),
        Direction::Short => (StructuralKind::BearReversal, StructuralKind::BullBreak),
    };

    let before = events.iter().rev().find(|e| e.timestamp_ms < signal_ts);
    let after = events.iter().find(|e| e.timestamp_ms >= signal_ts);

    if before.map(|e| e.kind) == Some(matching) || after.map(|e| e.kind) == Some(matching) {
        ValidationRank::Valid
    } else if after.map(|e| e.kind) == Some(blocking) {
        ValidationRank::Invalid
    } else {
        ValidationRank::Waiting
    }
}

/// Validates signal timestamps newest first, keeping the best rank seen and
/// stopping as soon as one comes back valid. An empty list ranks as waiting.
pub fn validate_best(
    events: &[StructuralEvent],
    signal_timestamps: &[i64],
    direction: Direction,
) -> ValidationRank {
    if signal_timestamps.is_empty() {
        return ValidationRank::Waiting;
    }
    let mut best = ValidationRank::Invalid;
    for &ts in signal_timestamps.iter().rev() {
        let rank = validate(events, ts, direction);
        if rank == ValidationRank::Valid {
            return rank;
        }
        best = best.max(rank);
    }
    best
}
