//! Orchestrator tests against a scripted in-memory provider. Each series
//! is deterministic and aligned so its last bar is closed at run time.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use cascade_scanner::analysis::ValidationRank;
use cascade_scanner::config::ScanMode;
use cascade_scanner::domain::{Candle, Direction, Timeframe};
use cascade_scanner::engine::{
    DiscardReason, PipelineStage, ProgressFn, ProgressSnapshot, SymbolOutcome, evaluate_symbol,
};
use cascade_scanner::utils::local_now_as_timestamp_ms;
use cascade_scanner::{FetchGate, MarketDataProvider, ScanConfig, Scanner};

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Profile {
    /// A fully scripted long setup that clears every stage.
    LongSetup,
    /// Same setup, but the structure series prints a bull reversal well
    /// before the execution signal.
    LongSetupConfirmed,
    /// Same setup, but the structure series prints a lone bear break
    /// after the execution signal.
    LongSetupOpposed,
    /// Valid trough shape, but the whole pattern series sits a month in
    /// the past so the anchor is over the age ceiling.
    StalePattern,
    /// A flat pattern series with no pivot shape at all.
    FlatPattern,
}

impl Profile {
    fn fetch_delay_ms(self) -> u64 {
        match self {
            Profile::LongSetup => 12,
            Profile::LongSetupConfirmed => 3,
            Profile::LongSetupOpposed => 2,
            Profile::StalePattern => 5,
            Profile::FlatPattern => 1,
        }
    }
}

/// Offline provider serving deterministic series for each pipeline fetch,
/// keyed by timeframe and requested depth.
struct ScriptedProvider {
    now_ms: i64,
    profiles: Vec<(String, Profile)>,
    pattern_fetches: AtomicUsize,
    momentum_fetches: AtomicUsize,
    later_fetches: AtomicUsize,
}

impl ScriptedProvider {
    fn new(profiles: &[(&str, Profile)]) -> Self {
        Self {
            now_ms: local_now_as_timestamp_ms(),
            profiles: profiles.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            pattern_fetches: AtomicUsize::new(0),
            momentum_fetches: AtomicUsize::new(0),
            later_fetches: AtomicUsize::new(0),
        }
    }

    fn profile_of(&self, symbol: &str) -> Option<Profile> {
        self.profiles
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, p)| *p)
    }

    fn timestamps(&self, base_now: i64, tf: Timeframe, limit: usize) -> Vec<i64> {
        let last_open = (base_now / tf.ms()) * tf.ms() - tf.ms();
        (0..limit)
            .map(|i| last_open - (limit - 1 - i) as i64 * tf.ms())
            .collect()
    }

    fn pattern_series(&self, profile: Profile) -> Vec<Candle> {
        let base_now = match profile {
            Profile::StalePattern => self.now_ms - 30 * DAY_MS,
            _ => self.now_ms,
        };
        let ts = self.timestamps(base_now, Timeframe::D1, 64);
        let mut closes = vec![100.0; 64];
        if profile != Profile::FlatPattern {
            // Trough shape over the last four pivots: down into 90, then
            // two rising pivots.
            closes[60..].copy_from_slice(&[100.0, 90.0, 95.0, 98.0]);
        }
        ts.iter()
            .zip(&closes)
            .map(|(&t, &c)| Candle::new(t, c, c, c, c, 1.0, c))
            .collect()
    }

    /// Rising half-point steps with a shakeout dip every ten bars.
    fn momentum_series(&self) -> Vec<Candle> {
        let ts = self.timestamps(self.now_ms, Timeframe::H4, 300);
        ts.iter()
            .enumerate()
            .map(|(i, &t)| {
                let dip = if i % 10 == 3 { 1.5 } else { 0.0 };
                let c = 100.0 + 0.5 * i as f64 - dip;
                Candle::new(t, c, c + 1.0, c - 1.0, c, 1.0, c)
            })
            .collect()
    }

    /// Band-continuation script mirrored for a long: two squeeze, break,
    /// retest, reclaim sequences, the second ending two bars before the
    /// series end.
    fn pullback_series(&self) -> Vec<Candle> {
        fn short_baseline(i: usize) -> (f64, f64, f64, f64) {
            let c = if i % 2 == 0 { 99.0 } else { 101.0 };
            (100.0, c + 0.5, c - 0.5, c)
        }
        fn short_script(i: usize) -> (f64, f64, f64, f64) {
            match i {
                30 => (96.5, 96.7, 94.5, 95.0),
                31 => (95.5, 97.5, 95.0, 97.0),
                32 => (95.0, 95.5, 92.5, 93.0),
                33 => (93.0, 93.5, 92.5, 93.0),
                34 => (92.3, 92.5, 91.5, 92.0),
                35 => (93.0, 96.5, 92.9, 95.5),
                36 => (95.5, 100.0, 95.4, 99.5),
                37 => (99.5, 101.0, 99.0, 100.5),
                38 => (100.0, 100.5, 96.0, 96.5),
                _ => short_baseline(i),
            }
        }

        let ts = self.timestamps(self.now_ms, Timeframe::H2, 300);
        ts.iter()
            .enumerate()
            .map(|(i, &t)| {
                let (o, h, l, c) = match i.checked_sub(220) {
                    Some(j @ 0..=78) => {
                        let k = if (70..=78).contains(&j) { j - 40 } else { j };
                        short_script(k)
                    }
                    _ => short_baseline(i),
                };
                // Long mirror around 200; high and low swap sides.
                Candle::new(t, 200.0 - o, 200.0 - l, 200.0 - h, 200.0 - c, 10.0, 1000.0)
            })
            .collect()
    }

    /// A long uptrend, a high-volume eight-bar flush that stays above the
    /// primary stop, a short base, then a heavy recovery that clears the
    /// secondary swing high.
    fn execution_series(&self) -> Vec<Candle> {
        let ts = self.timestamps(self.now_ms, Timeframe::H1, 400);
        ts.iter()
            .enumerate()
            .map(|(i, &t)| {
                let (c, vol) = if i < 50 {
                    (100.0, 1.0)
                } else if i < 340 {
                    (100.0 + 0.3 * (i - 49) as f64, 1.0)
                } else if i < 348 {
                    (187.0 - (i - 339) as f64, 5.0)
                } else if i < 352 {
                    (179.0 + if i % 2 == 0 { 0.2 } else { -0.2 }, 1.0)
                } else {
                    (179.0 + 1.5 * (i - 351) as f64, 8.0)
                };
                Candle::new(t, c, c + 0.1, c - 0.1, c, vol, vol * c)
            })
            .collect()
    }

    /// Flat by default, so no structural events. The confirmed variant
    /// scripts a bear break then a bull reversal long before the signal;
    /// the opposed variant scripts a lone bear break after it.
    fn structure_series(&self, profile: Profile) -> Vec<Candle> {
        let ts = self.timestamps(self.now_ms, Timeframe::H4, 400);
        ts.iter()
            .enumerate()
            .map(|(i, &t)| {
                let (h, l, c) = match (profile, i) {
                    (Profile::LongSetupConfirmed, 330) => (100.0, 98.0, 100.0),
                    (Profile::LongSetupConfirmed, 340) => (100.0, 97.4, 97.5),
                    (Profile::LongSetupConfirmed, 350) => (103.0, 100.0, 100.0),
                    (Profile::LongSetupConfirmed, 360) => (103.6, 100.0, 103.5),
                    (Profile::LongSetupOpposed, 380) => (100.0, 98.0, 100.0),
                    (Profile::LongSetupOpposed, 394) => (100.0, 97.4, 97.5),
                    _ => (100.0, 100.0, 100.0),
                };
                Candle::new(t, 100.0, h, l, c, 1.0, 100.0)
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> anyhow::Result<Vec<Candle>> {
        let Some(profile) = self.profile_of(symbol) else {
            bail!("unknown symbol {symbol}");
        };
        tokio::time::sleep(Duration::from_millis(profile.fetch_delay_ms())).await;

        match (timeframe, limit) {
            (Timeframe::D1, 64) => {
                self.pattern_fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.pattern_series(profile))
            }
            (Timeframe::H4, 300) => {
                self.momentum_fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.momentum_series())
            }
            (Timeframe::H2, 300) => {
                self.later_fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.pullback_series())
            }
            (Timeframe::H1, 400) => {
                self.later_fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.execution_series())
            }
            (Timeframe::H4, 400) => {
                self.later_fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.structure_series(profile))
            }
            (tf, n) => bail!("unexpected fetch: {tf} x {n}"),
        }
    }

    async fn list_symbols(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.profiles.iter().map(|(s, _)| s.clone()).collect())
    }
}

fn names(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn scripted_long_setup_survives_every_stage() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAAUSDT", Profile::LongSetup)]));
    let scanner = Scanner::new(Arc::clone(&provider), ScanConfig::for_mode(ScanMode::Swing));

    let report = scanner.run_scan_over(&names(&["AAAUSDT"]), None).await;
    let snap = &report.snapshot;
    assert_eq!(snap.symbols_total, 1);
    assert_eq!(snap.symbols_evaluated, 1);
    assert_eq!(snap.entering_stage2, 1);
    assert_eq!(snap.entering_stage3, 1);
    assert_eq!(snap.accepted.len(), 1);

    let record = &snap.accepted.long_waiting[0];
    assert_eq!(record.symbol, "AAAUSDT");
    assert_eq!(record.direction, Direction::Long);
    assert_eq!(record.validation, ValidationRank::Waiting);
    assert_eq!(record.diagnostics.signal_count, 1);
    assert!(record.diagnostics.momentum_peak.is_some_and(|v| v > 20.0));
    assert!(record.diagnostics.momentum_end.is_some_and(|v| v > 20.0));
    // The recovery crossover closes six bars into the 1.5-step climb.
    assert!((record.latest_signal_price - 188.0).abs() < 1e-9);
    assert!(record.latest_signal_ts > record.anchor_ts);
}

#[tokio::test]
async fn matching_reversal_promotes_the_setup_to_valid() {
    let provider = Arc::new(ScriptedProvider::new(&[(
        "AAAUSDT",
        Profile::LongSetupConfirmed,
    )]));
    let scanner = Scanner::new(Arc::clone(&provider), ScanConfig::for_mode(ScanMode::Swing));

    let report = scanner.run_scan_over(&names(&["AAAUSDT"]), None).await;
    let snap = &report.snapshot;
    assert_eq!(snap.accepted.len(), 1);
    assert!(snap.accepted.long_waiting.is_empty());

    let record = &snap.accepted.long_valid[0];
    assert_eq!(record.symbol, "AAAUSDT");
    assert_eq!(record.direction, Direction::Long);
    assert_eq!(record.validation, ValidationRank::Valid);
}

#[tokio::test]
async fn opposing_break_discards_at_the_structure_gate() {
    let provider = Arc::new(ScriptedProvider::new(&[(
        "AAAUSDT",
        Profile::LongSetupOpposed,
    )]));
    let config = ScanConfig::for_mode(ScanMode::Swing);
    let gate = FetchGate::new(Arc::clone(&provider), 4, config.retry);

    // The setup clears every earlier stage and falls at the last one.
    let (outcome, trace) = evaluate_symbol(&gate, &config, "AAAUSDT", provider.now_ms).await;
    match outcome {
        SymbolOutcome::Discarded { stage, reason } => {
            assert_eq!(stage, PipelineStage::Structure);
            assert_eq!(reason, DiscardReason::StructureInvalid);
        }
        other => panic!("expected a structure discard, got {other:?}"),
    }
    assert_eq!(trace.entered, PipelineStage::ORDER.to_vec());

    let scanner = Scanner::new(Arc::clone(&provider), config);
    let report = scanner.run_scan_over(&names(&["AAAUSDT"]), None).await;
    let snap = &report.snapshot;
    assert_eq!(snap.entering_stage2, 1);
    assert_eq!(snap.entering_stage3, 1);
    assert!(snap.accepted.is_empty());
}

#[tokio::test]
async fn stale_anchor_never_fetches_past_the_pattern_stage() {
    let provider = Arc::new(ScriptedProvider::new(&[("OLDUSDT", Profile::StalePattern)]));
    let scanner = Scanner::new(Arc::clone(&provider), ScanConfig::for_mode(ScanMode::Swing));

    let report = scanner.run_scan_over(&names(&["OLDUSDT"]), None).await;
    let snap = &report.snapshot;
    assert_eq!(snap.symbols_evaluated, 1);
    assert_eq!(snap.entering_stage2, 0);
    assert_eq!(snap.entering_stage3, 0);
    assert!(snap.accepted.is_empty());

    assert_eq!(provider.pattern_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(provider.momentum_fetches.load(Ordering::SeqCst), 0);
    assert_eq!(provider.later_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn aggregate_is_independent_of_scan_order() {
    let provider = Arc::new(ScriptedProvider::new(&[
        ("AAAUSDT", Profile::LongSetup),
        ("BBBUSDT", Profile::FlatPattern),
        ("CCCUSDT", Profile::StalePattern),
    ]));
    let scanner = Scanner::new(Arc::clone(&provider), ScanConfig::for_mode(ScanMode::Swing));

    let forward = scanner
        .run_scan_over(&names(&["AAAUSDT", "BBBUSDT", "CCCUSDT"]), None)
        .await;
    let reverse = scanner
        .run_scan_over(&names(&["CCCUSDT", "BBBUSDT", "AAAUSDT"]), None)
        .await;

    for report in [&forward, &reverse] {
        let snap = &report.snapshot;
        assert_eq!(snap.symbols_evaluated, 3);
        assert_eq!(snap.entering_stage2, 1);
        assert_eq!(snap.entering_stage3, 1);
        assert_eq!(snap.accepted.len(), 1);
        assert_eq!(snap.accepted.long_waiting[0].symbol, "AAAUSDT");
    }
}

#[tokio::test]
async fn progress_fires_after_every_symbol() {
    let provider = Arc::new(ScriptedProvider::new(&[
        ("AAAUSDT", Profile::FlatPattern),
        ("BBBUSDT", Profile::FlatPattern),
        ("CCCUSDT", Profile::FlatPattern),
    ]));
    let scanner = Scanner::new(Arc::clone(&provider), ScanConfig::for_mode(ScanMode::Swing));

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: Arc<ProgressFn> = Arc::new(move |snap: ProgressSnapshot| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(snap.symbols_evaluated);
        }
    });

    let symbols = names(&["AAAUSDT", "BBBUSDT", "CCCUSDT"]);
    scanner.run_scan_over(&symbols, Some(progress)).await;

    let mut counts = match seen.lock() {
        Ok(seen) => seen.clone(),
        Err(poisoned) => panic!("progress sink poisoned: {poisoned}"),
    };
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2, 3]);
}

#[tokio::test]
async fn trace_records_contiguous_stage_entries() {
    let provider = Arc::new(ScriptedProvider::new(&[
        ("AAAUSDT", Profile::LongSetup),
        ("BBBUSDT", Profile::FlatPattern),
    ]));
    let config = ScanConfig::for_mode(ScanMode::Swing);
    let gate = FetchGate::new(Arc::clone(&provider), 4, config.retry);

    let (outcome, trace) = evaluate_symbol(&gate, &config, "AAAUSDT", provider.now_ms).await;
    assert!(matches!(outcome, SymbolOutcome::Accepted(_)));
    assert_eq!(trace.entered, PipelineStage::ORDER.to_vec());
    assert!(trace.is_contiguous());

    let (outcome, trace) = evaluate_symbol(&gate, &config, "BBBUSDT", provider.now_ms).await;
    match outcome {
        SymbolOutcome::Discarded { stage, reason } => {
            assert_eq!(stage, PipelineStage::Pattern);
            assert_eq!(reason, DiscardReason::NoPivotPattern);
        }
        other => panic!("expected a pattern discard, got {other:?}"),
    }
    assert_eq!(trace.entered, vec![PipelineStage::Pattern]);
    assert!(trace.is_contiguous());
}

#[tokio::test]
async fn symbol_cache_survives_until_a_forced_refresh() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAAUSDT", Profile::FlatPattern)]));
    let scanner = Scanner::new(Arc::clone(&provider), ScanConfig::for_mode(ScanMode::Swing));

    let first = scanner.symbols(false).await.unwrap();
    let second = scanner.symbols(false).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let refreshed = scanner.symbols(true).await.unwrap();
    assert_eq!(*refreshed, *first);
    assert!(!Arc::ptr_eq(&first, &refreshed));
}
