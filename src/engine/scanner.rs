//! Scan orchestrator: one task per symbol, every fetch gated by the shared
//! admission semaphore, results folded into a single locked aggregate.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::config::ScanConfig;
use crate::data::{FetchGate, MarketDataProvider};
use crate::engine::context::PipelineStage;
use crate::engine::pipeline::{SymbolOutcome, evaluate_symbol};
use crate::engine::report::{ProgressSnapshot, ScanAggregate, ScanReport};
use crate::utils::local_now_as_timestamp_ms;

pub type ProgressFn = dyn Fn(ProgressSnapshot) + Send + Sync;

pub struct Scanner<P> {
    fetcher: Arc<FetchGate<P>>,
    config: Arc<ScanConfig>,
    symbol_cache: RwLock<Option<Arc<Vec<String>>>>,
}

impl<P: MarketDataProvider + 'static> Scanner<P> {
    pub fn new(provider: Arc<P>, config: ScanConfig) -> Self {
        let fetcher = Arc::new(FetchGate::new(
            provider,
            config.max_concurrent_fetches,
            config.retry,
        ));
        Self {
            fetcher,
            config: Arc::new(config),
            symbol_cache: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The symbol universe, cached across runs. A refresh replaces the
    /// snapshot wholesale; readers holding the old Arc are unaffected.
    /// A listing failure here is fatal to the caller, not degraded.
    pub async fn symbols(&self, force_refresh: bool) -> Result<Arc<Vec<String>>> {
        if !force_refresh
            && let Some(cached) = self.symbol_cache.read().await.as_ref()
        {
            return Ok(Arc::clone(cached));
        }

        let listed = self
            .fetcher
            .provider()
            .list_symbols()
            .await
            .context("symbol listing failed")?;
        let listed = Arc::new(listed);
        *self.symbol_cache.write().await = Some(Arc::clone(&listed));
        Ok(listed)
    }

    /// Full run over the cached universe.
    pub async fn run_scan(&self, progress: Option<Arc<ProgressFn>>) -> Result<ScanReport> {
        let symbols = self.symbols(false).await?;
        Ok(self.run_scan_over(&symbols, progress).await)
    }

    /// Run over an explicit symbol list. Completion order follows fetch
    /// resolution; the aggregate is identical regardless.
    pub async fn run_scan_over(
        &self,
        symbols: &[String],
        progress: Option<Arc<ProgressFn>>,
    ) -> ScanReport {
        let started_ms = local_now_as_timestamp_ms();
        let aggregate = Arc::new(Mutex::new(ScanAggregate::new(symbols.len())));

        let mut workers = JoinSet::new();
        for symbol in symbols {
            let fetcher = Arc::clone(&self.fetcher);
            let config = Arc::clone(&self.config);
            let aggregate = Arc::clone(&aggregate);
            let progress = progress.clone();
            let symbol = symbol.clone();

            workers.spawn(async move {
                let (outcome, trace) =
                    evaluate_symbol(&fetcher, &config, &symbol, started_ms).await;

                let snapshot = {
                    let mut agg = aggregate.lock().await;
                    agg.note_evaluated();
                    if trace.entered.contains(&PipelineStage::Confirmation) {
                        agg.note_stage2_entry();
                    }
                    if trace.entered.contains(&PipelineStage::Pullback) {
                        agg.note_stage3_entry();
                    }
                    match outcome {
                        SymbolOutcome::Accepted(record) => {
                            log::info!(
                                "{} accepted: {} ({})",
                                symbol,
                                record.direction,
                                record.validation
                            );
                            agg.accept(*record);
                        }
                        SymbolOutcome::Discarded { stage, reason } => {
                            log::debug!("{} discarded at {}: {}", symbol, stage, reason);
                        }
                    }
                    agg.snapshot()
                };

                if let Some(report) = &progress {
                    report(snapshot);
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("scan worker failed: {e}");
            }
        }

        let snapshot = aggregate.lock().await.snapshot();
        ScanReport {
            started_ms,
            finished_ms: local_now_as_timestamp_ms(),
            snapshot,
        }
    }
}
