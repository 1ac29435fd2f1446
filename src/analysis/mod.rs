pub mod band_pause;
pub mod final_signal;
pub mod indicators;
pub mod pressure;
pub mod smoothing;
pub mod structure;
pub mod swing;

pub use band_pause::continuation_signals;
pub use final_signal::{SignalBar, SignalDebug, final_signals, final_signals_debug};
pub use indicators::{
    Channel, TdiLines, adx, atr, bollinger_bands, keltner_channel, rsi, tdi_lines, tdi_state,
    true_range,
};
pub use pressure::{PressureParams, pressure_events, pressure_oscillator};
pub use smoothing::{exponential_average, running_average, simple_average};
pub use structure::{
    StructuralEvent, StructuralKind, ValidationRank, structural_events, validate, validate_best,
};
pub use swing::{SwingSeries, swing_trend};
