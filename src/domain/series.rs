use crate::domain::candle::Candle;
use crate::domain::timeframe::Timeframe;

// ============================================================================
// CandleSeries: raw time series data for one symbol at one timeframe
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    pub timeframe_ms: i64,

    pub timestamps: Vec<i64>,

    // Prices
    pub open_prices: Vec<f64>,
    pub high_prices: Vec<f64>,
    pub low_prices: Vec<f64>,
    pub close_prices: Vec<f64>,

    // Volumes
    pub base_asset_volumes: Vec<f64>,
    pub quote_asset_volumes: Vec<f64>,
}

impl CandleSeries {
    /// Create a series from a list of candles (fetch result).
    pub fn from_candles(timeframe: Timeframe, candles: &[Candle]) -> Self {
        let len = candles.len();

        // Pre-allocate everything
        let mut ts_vec = Vec::with_capacity(len);
        let mut open_vec = Vec::with_capacity(len);
        let mut high_vec = Vec::with_capacity(len);
        let mut low_vec = Vec::with_capacity(len);
        let mut close_vec = Vec::with_capacity(len);
        let mut base_vec = Vec::with_capacity(len);
        let mut quote_vec = Vec::with_capacity(len);

        for c in candles {
            ts_vec.push(c.timestamp_ms);
            open_vec.push(c.open_price);
            high_vec.push(c.high_price);
            low_vec.push(c.low_price);
            close_vec.push(c.close_price);
            base_vec.push(c.base_asset_volume);
            quote_vec.push(c.quote_asset_volume);
        }

        Self {
            timeframe_ms: timeframe.ms(),
            timestamps: ts_vec,
            open_prices: open_vec,
            high_prices: high_vec,
            low_prices: low_vec,
            close_prices: close_vec,
            base_asset_volumes: base_vec,
            quote_asset_volumes: quote_vec,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn get_candle(&self, idx: usize) -> Candle {
        Candle::new(
            self.timestamps[idx],
            self.open_prices[idx],
            self.high_prices[idx],
            self.low_prices[idx],
            self.close_prices[idx],
            self.base_asset_volumes[idx],
            self.quote_asset_volumes[idx],
        )
    }

    /// HLC3 for every bar, aligned 1:1 with the series.
    pub fn typical_prices(&self) -> Vec<f64> {
        self.high_prices
            .iter()
            .zip(&self.low_prices)
            .zip(&self.close_prices)
            .map(|((h, l), c)| (h + l + c) / 3.0)
            .collect()
    }

    /// Drop the trailing candle when it is still forming at `now_ms`.
    /// Everything downstream requires closed bars only.
    pub fn truncate_live(&mut self, now_ms: i64) {
        if let Some(&last_ts) = self.timestamps.last() {
            if last_ts + self.timeframe_ms > now_ms {
                self.timestamps.pop();
                self.open_prices.pop();
                self.high_prices.pop();
                self.low_prices.pop();
                self.close_prices.pop();
                self.base_asset_volumes.pop();
                self.quote_asset_volumes.pop();
            }
        }
    }
}
