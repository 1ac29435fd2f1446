pub mod time_utils;

pub use time_utils::TimeUtils;
pub use time_utils::{epoch_ms_to_utc, format_duration, local_now_as_timestamp_ms};
