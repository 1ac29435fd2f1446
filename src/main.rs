use std::panic;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tabled::{Table, Tabled, settings::Style};

use cascade_scanner::engine::ProgressFn;
use cascade_scanner::utils::{epoch_ms_to_utc, format_duration};
use cascade_scanner::{BinanceProvider, Cli, ProgressSnapshot, ScanReport, Scanner, SetupRecord};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Tabled)]
struct SetupRow {
    #[tabled(rename = "symbol")]
    symbol: String,
    #[tabled(rename = "dir")]
    direction: String,
    #[tabled(rename = "validation")]
    validation: String,
    #[tabled(rename = "anchor (utc)")]
    anchor: String,
    #[tabled(rename = "signal (utc)")]
    signal: String,
    #[tabled(rename = "price")]
    price: String,
    #[tabled(rename = "adx peak/end")]
    momentum: String,
    #[tabled(rename = "signals")]
    signals: usize,
}

impl From<&SetupRecord> for SetupRow {
    fn from(record: &SetupRecord) -> Self {
        let d = &record.diagnostics;
        let momentum = match (d.momentum_peak, d.momentum_end) {
            (Some(peak), Some(end)) => format!("{peak:.1}/{end:.1}"),
            _ => "-".to_string(),
        };
        Self {
            symbol: record.symbol.clone(),
            direction: record.direction.to_string(),
            validation: record.validation.to_string(),
            anchor: epoch_ms_to_utc(record.anchor_ts),
            signal: epoch_ms_to_utc(record.latest_signal_ts),
            price: format!("{:.6}", record.latest_signal_price),
            momentum,
            signals: d.signal_count,
        }
    }
}

fn progress_printer() -> Arc<ProgressFn> {
    let state = Mutex::new((Instant::now() - PROGRESS_INTERVAL, 0usize));
    Arc::new(move |snap: ProgressSnapshot| {
        let Ok(mut state) = state.lock() else {
            return;
        };
        let (last_print, last_accepted) = *state;
        let accepted = snap.accepted.len();
        // Always show a fresh acceptance, otherwise throttle
        if accepted == last_accepted && last_print.elapsed() < PROGRESS_INTERVAL {
            return;
        }
        *state = (Instant::now(), accepted);
        eprintln!(
            "scanned {}/{} | stage2 {} | stage3 {} | accepted {}",
            snap.symbols_evaluated,
            snap.symbols_total,
            snap.entering_stage2,
            snap.entering_stage3,
            accepted
        );
    })
}

fn print_report(report: &ScanReport, json: bool) -> Result<()> {
    let records = report.snapshot.accepted.all();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!(
            "No setups across {} symbols ({}).",
            report.snapshot.symbols_total,
            format_duration(report.elapsed_ms())
        );
        return Ok(());
    }

    let rows: Vec<SetupRow> = records.iter().map(SetupRow::from).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!(
        "{} setups from {} symbols in {}.",
        records.len(),
        report.snapshot.symbols_total,
        format_duration(report.elapsed_ms())
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Warn)
    };
    env_logger::Builder::new()
        .filter(None, global_level)
        .filter(Some("cascade_scanner"), my_code_level)
        .init();

    let args = Cli::parse();
    let config = args.scan_config();
    log::info!(
        "{} scan: pattern {} / momentum {} / pullback {} / execution {} / structure {}",
        config.mode,
        config.timeframes.pattern,
        config.timeframes.momentum,
        config.timeframes.pullback,
        config.timeframes.execution,
        config.timeframes.structure,
    );

    let provider = Arc::new(BinanceProvider::connect(&args.quote)?);
    let scanner = Scanner::new(provider, config);

    let universe = scanner.symbols(args.refresh_symbols).await?;
    let symbols: Vec<String> = match args.max_symbols {
        Some(cap) => universe.iter().take(cap).cloned().collect(),
        None => universe.to_vec(),
    };
    eprintln!("Scanning {} symbols...", symbols.len());

    let report = scanner
        .run_scan_over(&symbols, Some(progress_printer()))
        .await;
    print_report(&report, args.json)
}
