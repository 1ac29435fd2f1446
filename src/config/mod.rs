mod binance;
pub mod constants;
mod scan;
mod types;

pub use {
    binance::{BINANCE, BinanceApiConfig},
    scan::{FetchPlan, RetryPolicy, ScanConfig, Thresholds, TimeframePlan},
    types::ScanMode,
};
