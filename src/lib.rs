#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

pub use config::{ScanConfig, ScanMode};
pub use data::{BinanceProvider, FetchGate, MarketDataProvider};
pub use engine::{ProgressSnapshot, ScanReport, Scanner, SetupRecord};

// CLI argument parsing
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Scan mode: timeframe ladder and anchor-age ceiling preset
    #[arg(long, value_enum, default_value_t = ScanMode::Swing)]
    pub mode: ScanMode,

    /// Cap on simultaneously in-flight fetches
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Quote asset suffix the symbol universe is filtered to
    #[arg(long, default_value = "USDT")]
    pub quote: String,

    /// Evaluate only the first N symbols of the universe
    #[arg(long)]
    pub max_symbols: Option<usize>,

    /// Drop the cached symbol listing before the run
    #[arg(long, default_value_t = false)]
    pub refresh_symbols: bool,

    /// Emit the accepted records as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl Cli {
    pub fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::for_mode(self.mode);
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_fetches = concurrency.max(1);
        }
        config
    }
}
