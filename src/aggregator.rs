use crate::chain::types::OptionType;
use crate::scanners::{Scanner, Signal, SignalPayload};
use chrono::NaiveDate;
use serde::Serialize;
use smallvec::SmallVec;

/// One flat report row: identifying fields, the source scanner, and the
/// scanner payload inlined next to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub scanner: Scanner,
    pub ticker: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub option_type: OptionType,
    pub tag: &'static str,
    #[serde(flatten)]
    pub payload: SignalPayload,
}

/// All signals for one ticker, ordered by scanner declaration order and
/// then by input-chain order. No deduplication across scanners.
#[derive(Debug, Clone, Serialize)]
pub struct SignalTable {
    pub ticker: String,
    pub rows: Vec<SignalRow>,
}

impl SignalTable {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row count per scanner, every scanner listed.
    pub fn counts(&self) -> SmallVec<[(Scanner, usize); 5]> {
        Scanner::ALL
            .iter()
            .map(|&s| (s, self.rows.iter().filter(|r| r.scanner == s).count()))
            .collect()
    }
}

/// Merge per-scanner outputs into one table. Each row is tagged with the
/// scanner whose list it came from.
pub fn aggregate(ticker: &str, mut per_scanner: Vec<(Scanner, Vec<Signal>)>) -> SignalTable {
    // Stable: lists for the same scanner keep their relative order
    per_scanner.sort_by_key(|(scanner, _)| *scanner);

    let rows = per_scanner
        .into_iter()
        .flat_map(|(scanner, signals)| {
            signals.into_iter().map(move |s| SignalRow {
                scanner,
                ticker: s.ticker,
                expiry: s.expiry,
                strike: s.strike,
                option_type: s.option_type,
                tag: s.tag,
                payload: s.payload,
            })
        })
        .collect();

    SignalTable { ticker: ticker.to_string(), rows }
}
