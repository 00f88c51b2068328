use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;

// ── Run-wide counters ──

/// Lock-free tallies shared by every ticker pipeline of one run.
/// Relaxed ordering: the values are only read for the end-of-run summary.
#[derive(Debug, Default)]
pub struct ScanCounters {
    pub tickers_scanned: AtomicU64,
    pub tickers_failed: AtomicU64,
    pub contracts_fetched: AtomicU64,
    pub contracts_rejected: AtomicU64,
    pub iv_unresolved: AtomicU64,
    pub signals_emitted: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CounterSnapshot {
    pub tickers_scanned: u64,
    pub tickers_failed: u64,
    pub contracts_fetched: u64,
    pub contracts_rejected: u64,
    pub iv_unresolved: u64,
    pub signals_emitted: u64,
}

impl ScanCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            tickers_scanned: self.tickers_scanned.load(Ordering::Relaxed),
            tickers_failed: self.tickers_failed.load(Ordering::Relaxed),
            contracts_fetched: self.contracts_fetched.load(Ordering::Relaxed),
            contracts_rejected: self.contracts_rejected.load(Ordering::Relaxed),
            iv_unresolved: self.iv_unresolved.load(Ordering::Relaxed),
            signals_emitted: self.signals_emitted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_across_threads() {
        let counters = Arc::new(ScanCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        ScanCounters::add(&c.signals_emitted, 2);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counters.snapshot().signals_emitted, 8_000);
        assert_eq!(counters.snapshot().tickers_failed, 0);
    }
}
