use {
    anyhow::{Result, bail},
    binance_sdk::{
        config::ConfigurationRestApi,
        errors::{self, ConnectorError},
        spot::{
            SpotRestApi,
            rest_api::{
                KlinesIntervalEnum, KlinesItemInner, KlinesParams, RestApi, TickerPriceParams,
                TickerPriceResponse,
            },
        },
    },
    std::{collections::HashSet, convert::TryFrom, error::Error, fmt},
};

use async_trait::async_trait;

use crate::{
    config::{BINANCE, BinanceApiConfig},
    data::provider::MarketDataProvider,
    domain::{Candle, Timeframe},
};

fn interval_for(timeframe: Timeframe) -> KlinesIntervalEnum {
    match timeframe {
        Timeframe::M5 => KlinesIntervalEnum::Interval5m,
        Timeframe::M15 => KlinesIntervalEnum::Interval15m,
        Timeframe::M30 => KlinesIntervalEnum::Interval30m,
        Timeframe::H1 => KlinesIntervalEnum::Interval1h,
        Timeframe::H2 => KlinesIntervalEnum::Interval2h,
        Timeframe::H4 => KlinesIntervalEnum::Interval4h,
        Timeframe::D1 => KlinesIntervalEnum::Interval1d,
        Timeframe::W1 => KlinesIntervalEnum::Interval1w,
    }
}

#[derive(Debug, PartialOrd, PartialEq)]
pub struct BnKline {
    pub open_timestamp_ms: i64,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub base_asset_volume: Option<f64>,
    pub quote_asset_volume: Option<f64>,
}

#[derive(Debug)]
pub enum BnKlineError {
    InvalidLength,
    InvalidType(String),
    ConnectionFailed(String),
}

impl fmt::Display for BnKlineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> std::fmt::Result {
        match self {
            BnKlineError::InvalidLength => write!(f, "Invalid length"),
            BnKlineError::InvalidType(string) => write!(f, "Invalid type: {}", string),
            BnKlineError::ConnectionFailed(msg) => {
                write!(f, "Binance API connection failed: {}.", msg)
            }
        }
    }
}

impl Error for BnKlineError {}

fn kline_item_as_float(item: Option<KlinesItemInner>) -> Option<f64> {
    item.and_then(|inner| {
        if let KlinesItemInner::String(s) = inner {
            s.parse::<f64>().ok()
        } else {
            None
        }
    })
}

impl TryFrom<Vec<KlinesItemInner>> for BnKline {
    type Error = BnKlineError;

    fn try_from(items: Vec<KlinesItemInner>) -> Result<Self, Self::Error> {
        debug_assert_eq!(12, items.len());

        let mut items = items.into_iter();
        let open_timestamp_ms = match items.next().ok_or(BnKlineError::InvalidLength)? {
            KlinesItemInner::Integer(a) => a,
            _ => return Err(BnKlineError::InvalidType("open_time".to_string())),
        };

        let open_price = kline_item_as_float(items.next());
        let high_price = kline_item_as_float(items.next());
        let low_price = kline_item_as_float(items.next());
        let close_price = kline_item_as_float(items.next());
        let volume = kline_item_as_float(items.next());
        let _ = items.next(); // close_time, unused
        let quote_asset_volume = kline_item_as_float(items.next());

        Ok(BnKline {
            open_timestamp_ms,
            open_price,
            high_price,
            low_price,
            close_price,
            base_asset_volume: volume,
            quote_asset_volume,
        })
    }
}

impl From<BnKline> for Candle {
    fn from(bn: BnKline) -> Self {
        Candle::new(
            bn.open_timestamp_ms,
            bn.open_price.unwrap_or_default(),
            bn.high_price.unwrap_or_default(),
            bn.low_price.unwrap_or_default(),
            bn.close_price.unwrap_or_default(),
            bn.base_asset_volume.unwrap_or_default(),
            bn.quote_asset_volume.unwrap_or_default(),
        )
    }
}

fn convert_klines(data: Vec<Vec<KlinesItemInner>>) -> Result<Vec<BnKline>, BnKlineError> {
    data.into_iter().map(Vec::try_into).collect()
}

fn has_duplicate_open_time(klines: &[BnKline]) -> bool {
    let mut seen = HashSet::new();
    for kline in klines {
        if !seen.insert(kline.open_timestamp_ms) {
            return true;
        }
    }
    false
}

fn configure_binance_client() -> Result<RestApi> {
    let config = BinanceApiConfig::default();
    let rest_conf = ConfigurationRestApi::builder()
        .timeout(config.timeout_ms)
        .retries(config.retries)
        .backoff(config.backoff_ms)
        .build()?;
    Ok(SpotRestApi::production(rest_conf))
}

fn log_connector_error(symbol: &str, err: &anyhow::Error) {
    if let Some(conn_err) = err.downcast_ref::<errors::ConnectorError>() {
        match conn_err {
            ConnectorError::TooManyRequestsError(msg) => {
                log::warn!("{} rate limit exceeded: {}", symbol, msg);
            }
            ConnectorError::RateLimitBanError(msg) => {
                log::error!("{} IP banned for excessive rate limits: {}", symbol, msg);
            }
            ConnectorError::NetworkError(msg) => {
                log::warn!("{} network error: {}", symbol, msg);
            }
            ConnectorError::ServerError { msg, status_code } => {
                log::error!("{} server error: {} (status {:?})", symbol, msg, status_code);
            }
            other => {
                log::error!("{} connector error: {:?}", symbol, other);
            }
        }
    } else {
        log::error!("{} unexpected fetch error: {:#}", symbol, err);
    }
}

/// Spot REST adapter. One client is configured up front; a failure here is
/// fatal to the run, while per-request failures stay soft.
pub struct BinanceProvider {
    rest_client: RestApi,
    quote_suffix: String,
}

impl BinanceProvider {
    pub fn connect(quote_suffix: &str) -> Result<Self> {
        if quote_suffix.is_empty() {
            bail!("quote asset suffix must not be empty");
        }
        Ok(Self {
            rest_client: configure_binance_client()?,
            quote_suffix: quote_suffix.to_uppercase(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let limit = (limit as i32).min(BINANCE.limits.klines_limit);
        let params = KlinesParams::builder(symbol.to_string(), interval_for(timeframe))
            .limit(limit)
            .build()?;

        let raw = match self.rest_client.klines(params).await {
            Ok(response) => response.data().await?,
            Err(e) => {
                log_connector_error(symbol, &e);
                return Err(anyhow::Error::new(BnKlineError::ConnectionFailed(e.to_string()))
                    .context(format!("klines request failed for {symbol}@{timeframe}")));
            }
        };

        let klines = convert_klines(raw)
            .map_err(|e| anyhow::Error::new(e).context(format!("{symbol} convert_klines failed")))?;
        if has_duplicate_open_time(&klines) {
            bail!("duplicate open time in klines for {symbol}@{timeframe}");
        }

        Ok(klines.into_iter().map(Candle::from).collect())
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        let params = TickerPriceParams {
            symbol: None,
            symbols: None,
            symbol_status: None,
        };

        let response = self
            .rest_client
            .ticker_price(params)
            .await
            .map_err(|e| anyhow::anyhow!("ticker_price request failed: {e}"))?;

        match response.data().await? {
            TickerPriceResponse::TickerPriceResponse2(all_tickers) => {
                let mut symbols: Vec<String> = all_tickers
                    .into_iter()
                    .filter_map(|t| match (t.symbol, t.price) {
                        (Some(s), Some(p)) => {
                            let tradable = s.ends_with(&self.quote_suffix)
                                && p.parse::<f64>().map(|v| v > 0.0).unwrap_or(false);
                            tradable.then_some(s)
                        }
                        _ => None,
                    })
                    .collect();
                symbols.sort();
                Ok(symbols)
            }
            _ => bail!("unexpected ticker_price response shape for batch listing"),
        }
    }
}
