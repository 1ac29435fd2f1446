mod binance;
mod fetcher;
mod provider;

pub use {
    binance::BinanceProvider,
    fetcher::FetchGate,
    provider::MarketDataProvider,
};
