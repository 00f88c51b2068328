mod aggregator;
mod chain;
mod config;
mod errors;
mod feeds;
mod models;
mod pipeline;
mod report;
mod scanners;
mod state;

use crate::chain::enricher::ChainEnricher;
use crate::config::ProviderKind;
use crate::feeds::fixture::FixtureProvider;
use crate::feeds::polygon::PolygonProvider;
use crate::feeds::DataProvider;
use crate::models::black_scholes::BlackScholes;
use crate::pipeline::Pipeline;
use crate::report::console::ConsoleReportSink;
use crate::report::json::JsonReportSink;
use crate::report::ReportSink;
use crate::state::ScanCounters;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    eprintln!("[chain_scanner] binary started, setting up logging...");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Tickers on the command line win over TICKERS
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        cfg.tickers = config::parse_tickers(&args.join(","));
    }
    if cfg.tickers.is_empty() {
        tracing::error!("no tickers: pass them as arguments or set TICKERS");
        std::process::exit(2);
    }

    let run_id = Uuid::new_v4();
    tracing::info!(
        run_id = %run_id,
        tickers = ?cfg.tickers,
        provider = ?cfg.data_provider,
        max_concurrent = cfg.max_concurrent_tickers,
        "chain scanner starting"
    );

    let provider: Arc<dyn DataProvider> = match cfg.data_provider {
        ProviderKind::Polygon => {
            match PolygonProvider::new(&cfg.polygon_base_url, &cfg.polygon_api_key) {
                Ok(p) => Arc::new(p),
                Err(e) => {
                    tracing::error!("provider init error: {e}");
                    std::process::exit(1);
                }
            }
        }
        ProviderKind::Fixture => Arc::new(FixtureProvider::new(cfg.fixture_dir.clone())),
    };

    let sinks: Vec<Arc<dyn ReportSink>> = vec![
        Arc::new(JsonReportSink::new(cfg.reports_dir.clone(), run_id)),
        Arc::new(ConsoleReportSink::default()),
    ];

    let counters = Arc::new(ScanCounters::new());
    let pipeline = Pipeline::new(
        provider,
        ChainEnricher::new(Arc::new(BlackScholes::new())),
        cfg.scanner.clone(),
        sinks,
        Arc::clone(&counters),
    );

    let results = pipeline
        .run(&cfg.tickers, cfg.max_concurrent_tickers, chrono::Utc::now())
        .instrument(tracing::info_span!("run", run_id = %run_id))
        .await;

    for (ticker, result) in &results {
        match result {
            Ok(summary) => {
                let counts: Vec<String> =
                    summary.counts.iter().map(|(s, n)| format!("{s}={n}")).collect();
                tracing::info!(
                    ticker = %ticker,
                    contracts = summary.contracts,
                    rejected = summary.rejected,
                    unresolved = summary.unresolved,
                    signals = summary.signals,
                    by_scanner = %counts.join(" "),
                    "ticker done"
                );
            }
            Err(e) => tracing::error!(ticker = %ticker, error = %e, "ticker failed"),
        }
    }

    let totals = counters.snapshot();
    tracing::info!(
        run_id = %run_id,
        tickers_scanned = totals.tickers_scanned,
        tickers_failed = totals.tickers_failed,
        contracts_fetched = totals.contracts_fetched,
        contracts_rejected = totals.contracts_rejected,
        iv_unresolved = totals.iv_unresolved,
        signals_emitted = totals.signals_emitted,
        "scan complete"
    );

    if totals.tickers_failed as usize == results.len() {
        std::process::exit(1);
    }
}
