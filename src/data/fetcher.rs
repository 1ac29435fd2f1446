use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::RetryPolicy;
use crate::data::provider::MarketDataProvider;
use crate::domain::{CandleSeries, Timeframe};

/// Admission-controlled fetch front end shared by every worker in a run.
/// A permit is held only for the duration of one network attempt; backoff
/// sleeps happen outside the gate so a slow retry cannot starve other
/// symbols.
pub struct FetchGate<P> {
    provider: Arc<P>,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl<P: MarketDataProvider> FetchGate<P> {
    pub fn new(provider: Arc<P>, max_concurrent: usize, retry: RetryPolicy) -> Self {
        Self {
            provider,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            retry,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch one series of closed bars. Transient failures retry with
    /// doubling backoff; exhaustion degrades to an empty series, which the
    /// pipeline treats as an ordinary discard.
    pub async fn fetch_closed(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        now_ms: i64,
    ) -> CandleSeries {
        let attempts = self.retry.attempts.max(1);
        for attempt in 0..attempts {
            let outcome = match self.permits.acquire().await {
                Ok(_permit) => self.provider.fetch_candles(symbol, timeframe, limit).await,
                Err(closed) => {
                    log::error!("fetch gate closed unexpectedly: {closed}");
                    break;
                }
            };

            match outcome {
                Ok(candles) => {
                    let mut series = CandleSeries::from_candles(timeframe, &candles);
                    series.truncate_live(now_ms);
                    return series;
                }
                Err(e) => {
                    log::warn!(
                        "{symbol}@{timeframe} fetch attempt {}/{attempts} failed: {e:#}",
                        attempt + 1
                    );
                    if attempt + 1 < attempts {
                        let delay = self.retry.backoff_base_ms << attempt;
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        log::warn!("{symbol}@{timeframe} out of retries, degrading to empty data");
        CandleSeries::from_candles(timeframe, &[])
    }
}
