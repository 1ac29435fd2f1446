use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Scan horizon. Picks the timeframe ladder and how stale an anchor pivot
/// may be before a candidate is thrown away.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, ValueEnum, Default,
)]
pub enum ScanMode {
    Intraday,
    #[default]
    Swing,
    Position,
}
