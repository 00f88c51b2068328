use crate::aggregator::{self, SignalTable};
use crate::chain::enricher::ChainEnricher;
use crate::config::ScannerConfig;
use crate::errors::ScanResult;
use crate::feeds::DataProvider;
use crate::report::ReportSink;
use crate::scanners::{self, Scanner};
use crate::state::ScanCounters;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use smallvec::SmallVec;
use std::sync::Arc;

/// Per-ticker outcome of one scan.
#[derive(Debug, Clone)]
pub struct TickerSummary {
    pub contracts: usize,
    pub rejected: usize,
    pub unresolved: usize,
    pub signals: usize,
    pub counts: SmallVec<[(Scanner, usize); 5]>,
}

/// fetch -> enrich -> scan -> aggregate -> report, per ticker.
/// Tickers share nothing but the read-only config and the atomic counters.
pub struct Pipeline {
    provider: Arc<dyn DataProvider>,
    enricher: ChainEnricher,
    config: Arc<ScannerConfig>,
    sinks: Vec<Arc<dyn ReportSink>>,
    counters: Arc<ScanCounters>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        enricher: ChainEnricher,
        config: ScannerConfig,
        sinks: Vec<Arc<dyn ReportSink>>,
        counters: Arc<ScanCounters>,
    ) -> Self {
        Self { provider, enricher, config: Arc::new(config), sinks, counters }
    }

    pub async fn scan_ticker(&self, ticker: &str, as_of: DateTime<Utc>) -> ScanResult<TickerSummary> {
        tracing::info!(ticker = %ticker, provider = self.provider.name(), "fetching option chain");

        let raw = self.provider.fetch_chain(ticker).await?;
        ScanCounters::add(&self.counters.contracts_fetched, raw.len());
        if raw.is_empty() {
            tracing::warn!(ticker = %ticker, "no options data");
        }

        // Pure computation: keep it off the async workers
        let enricher = self.enricher.clone();
        let config = Arc::clone(&self.config);
        let owned_ticker = ticker.to_string();
        let (enrichment, table) = tokio::task::spawn_blocking(move || {
            let enrichment = enricher.enrich(&raw, config.risk_free_rate, as_of);
            let per_scanner = scanners::run_all(&enrichment.contracts, &config);
            let table = aggregator::aggregate(&owned_ticker, per_scanner);
            (enrichment, table)
        })
        .await?;

        let unresolved = enrichment.unresolved();
        ScanCounters::add(&self.counters.contracts_rejected, enrichment.rejected.len());
        ScanCounters::add(&self.counters.iv_unresolved, unresolved);
        ScanCounters::add(&self.counters.signals_emitted, table.len());

        tracing::info!(
            ticker = %ticker,
            model = self.enricher.model_name(),
            contracts = enrichment.contracts.len(),
            rejected = enrichment.rejected.len(),
            unresolved = unresolved,
            signals = table.len(),
            "chain scanned"
        );

        let summary = TickerSummary {
            contracts: enrichment.contracts.len(),
            rejected: enrichment.rejected.len(),
            unresolved,
            signals: table.len(),
            counts: table.counts(),
        };

        if table.is_empty() {
            tracing::info!(ticker = %ticker, "no significant signals");
        } else {
            self.publish(ticker, table).await?;
        }

        Ok(summary)
    }

    /// Sinks do blocking file and stdout I/O, so they run on a blocking worker.
    /// A failing sink is logged and skipped; the others still receive the table.
    async fn publish(&self, ticker: &str, table: SignalTable) -> ScanResult<()> {
        let sinks = self.sinks.clone();
        let ticker = ticker.to_string();
        tokio::task::spawn_blocking(move || {
            for sink in &sinks {
                if let Err(e) = sink.write(&ticker, &table) {
                    tracing::warn!(ticker = %ticker, sink = sink.name(), error = %e, "report write failed");
                }
            }
        })
        .await?;
        Ok(())
    }

    /// Scan every ticker, at most `max_concurrent` at a time.
    /// Results come back in `tickers` order; one failure never stops the rest.
    pub async fn run(
        &self,
        tickers: &[String],
        max_concurrent: usize,
        as_of: DateTime<Utc>,
    ) -> Vec<(String, ScanResult<TickerSummary>)> {
        stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                let result = self.scan_ticker(&ticker, as_of).await;
                ScanCounters::add(&self.counters.tickers_scanned, 1);
                if let Err(e) = &result {
                    ScanCounters::add(&self.counters.tickers_failed, 1);
                    tracing::warn!(ticker = %ticker, error = %e, "ticker scan failed");
                }
                (ticker, result)
            })
            .buffered(max_concurrent.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::enricher::time_to_expiry;
    use crate::chain::types::{Contract, OptionType};
    use crate::errors::ScanError;
    use crate::models::black_scholes::BlackScholes;
    use crate::models::{ContractParams, PricingModel};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const RATE: f64 = 0.045;

    struct StaticProvider {
        chains: HashMap<String, Vec<Contract>>,
    }

    #[async_trait]
    impl DataProvider for StaticProvider {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch_chain(&self, ticker: &str) -> ScanResult<Vec<Contract>> {
            if ticker == "DOWN" {
                return Err(ScanError::ProviderApi { status: 503, body: "unavailable".into() });
            }
            Ok(self.chains.get(ticker).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        written: Mutex<Vec<(String, Vec<Scanner>)>>,
        threads: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl ReportSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn write(&self, ticker: &str, table: &SignalTable) -> ScanResult<()> {
            let scanners = table.rows.iter().map(|r| r.scanner).collect();
            self.written.lock().unwrap().push((ticker.to_string(), scanners));
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(())
        }
    }

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn write(&self, _ticker: &str, _table: &SignalTable) -> ScanResult<()> {
            Err(ScanError::Report("disk full".into()))
        }
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()
    }

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 12, 18).unwrap()
    }

    /// ATM-ish call quoted tightly around the Black-Scholes price for `vol`.
    fn quoted(strike: f64, vol: f64, volume: u64, open_interest: u64) -> Contract {
        let ttl = time_to_expiry(expiry(), as_of()).unwrap();
        let p = ContractParams::new(100.0, strike, ttl, OptionType::Call).unwrap();
        let fair = BlackScholes::new().price(&p, vol, RATE).unwrap();
        Contract {
            ticker: "SPY".into(),
            expiry: expiry(),
            strike,
            option_type: OptionType::Call,
            bid: Some(fair - 0.01),
            ask: Some(fair + 0.01),
            last: Some(fair),
            volume,
            open_interest,
            spot: 100.0,
            vendor_iv: None,
            symbol: None,
        }
    }

    fn pipeline(
        chains: HashMap<String, Vec<Contract>>,
        sinks: Vec<Arc<dyn ReportSink>>,
    ) -> (Pipeline, Arc<ScanCounters>) {
        let counters = Arc::new(ScanCounters::new());
        let pipeline = Pipeline::new(
            Arc::new(StaticProvider { chains }),
            ChainEnricher::new(Arc::new(BlackScholes::new())),
            ScannerConfig::default(),
            sinks,
            Arc::clone(&counters),
        );
        (pipeline, counters)
    }

    #[tokio::test]
    async fn test_end_to_end_chain() {
        let mut rich = quoted(100.0, 0.30, 300, 1_000);
        rich.vendor_iv = Some(0.20);
        let mut unsolvable = quoted(80.0, 0.30, 5_000, 1_000);
        unsolvable.bid = Some(10.0);
        unsolvable.ask = Some(10.2);
        let mut crossed = quoted(95.0, 0.30, 10, 10);
        crossed.bid = Some(9.0);
        crossed.ask = Some(8.0);

        let mut hot = quoted(105.0, 0.95, 20, 10);
        hot.vendor_iv = Some(0.95);

        let chain = vec![rich, hot, unsolvable, crossed];
        let sink = Arc::new(RecordingSink::default());
        let (pipeline, counters) =
            pipeline(HashMap::from([("SPY".to_string(), chain)]), vec![sink.clone()]);

        let summary = pipeline.scan_ticker("SPY", as_of()).await.unwrap();

        assert_eq!(summary.contracts, 3);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.unresolved, 1);

        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        let (ticker, scanners) = &written[0];
        assert_eq!(ticker, "SPY");
        // hot call -> IV high; unsolvable call -> UOA + spread only;
        // rich call: vendor 0.20 vs solved 0.30 -> overpriced; both solved -> two buckets
        assert_eq!(
            scanners,
            &vec![
                Scanner::Iv,
                Scanner::Uoa,
                Scanner::DeltaBucket,
                Scanner::DeltaBucket,
                Scanner::Mispricing,
                Scanner::SpreadQuality,
                Scanner::SpreadQuality,
            ]
        );
        assert_eq!(summary.signals, scanners.len());

        let totals = counters.snapshot();
        assert_eq!(totals.contracts_fetched, 4);
        assert_eq!(totals.contracts_rejected, 1);
        assert_eq!(totals.iv_unresolved, 1);
    }

    #[tokio::test]
    async fn test_empty_chain_is_not_an_error() {
        let sink = Arc::new(RecordingSink::default());
        let (pipeline, _) = pipeline(HashMap::new(), vec![sink.clone()]);

        let summary = pipeline.scan_ticker("QQQ", as_of()).await.unwrap();
        assert_eq!(summary.contracts, 0);
        assert_eq!(summary.signals, 0);
        assert!(sink.written.lock().unwrap().is_empty(), "empty tables are not reported");
    }

    #[tokio::test]
    async fn test_failing_ticker_and_sink_isolated() {
        let chain = vec![quoted(100.0, 0.95, 20, 10)];
        let sink = Arc::new(RecordingSink::default());
        let (pipeline, counters) = pipeline(
            HashMap::from([("SPY".to_string(), chain)]),
            vec![Arc::new(FailingSink), sink.clone()],
        );

        let tickers = vec!["DOWN".to_string(), "SPY".to_string(), "QQQ".to_string()];
        let results = pipeline.run(&tickers, 2, as_of()).await;

        let order: Vec<_> = results.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(order, vec!["DOWN", "SPY", "QQQ"]);
        assert!(matches!(results[0].1, Err(ScanError::ProviderApi { status: 503, .. })));
        assert!(results[1].1.is_ok());
        assert!(results[2].1.is_ok());

        // The failing sink did not keep the table from the recording one
        assert_eq!(sink.written.lock().unwrap().len(), 1);

        let totals = counters.snapshot();
        assert_eq!(totals.tickers_scanned, 3);
        assert_eq!(totals.tickers_failed, 1);
    }

    #[tokio::test]
    async fn test_sinks_run_off_the_runtime_thread() {
        // Current-thread runtime: the test body runs on the only async worker
        let chain = vec![quoted(100.0, 0.95, 20, 10)];
        let sink = Arc::new(RecordingSink::default());
        let (pipeline, _) =
            pipeline(HashMap::from([("SPY".to_string(), chain)]), vec![sink.clone()]);

        pipeline.scan_ticker("SPY", as_of()).await.unwrap();

        let threads = sink.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }
}
