use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Candle, Timeframe};

/// Abstract interface for fetching market data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch up to `limit` of the most recent candles for one symbol at one
    /// timeframe, ascending by open time. The trailing candle may still be
    /// forming.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// The tradable symbol universe.
    async fn list_symbols(&self) -> Result<Vec<String>>;
}
