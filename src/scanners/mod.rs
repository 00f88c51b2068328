pub mod delta;
pub mod iv;
pub mod mispricing;
pub mod spread;
pub mod uoa;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::chain::types::{EnrichedContract, OptionType};
use crate::config::ScannerConfig;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

/// Below this many contracts the five scanners run inline instead of on the pool.
const PARALLEL_MIN_CONTRACTS: usize = 2_000;

/// The scanner strategies. Declaration order is report order.
///
/// Every strategy shares one contract: read-only enriched chain in,
/// zero or more signals out. Adding a strategy means adding a variant
/// and its `scan` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scanner {
    Iv,
    Uoa,
    DeltaBucket,
    Mispricing,
    SpreadQuality,
}

impl Scanner {
    pub const ALL: [Scanner; 5] = [
        Scanner::Iv,
        Scanner::Uoa,
        Scanner::DeltaBucket,
        Scanner::Mispricing,
        Scanner::SpreadQuality,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Iv => "iv",
            Self::Uoa => "uoa",
            Self::DeltaBucket => "delta_bucket",
            Self::Mispricing => "mispricing",
            Self::SpreadQuality => "spread_quality",
        }
    }

    /// Pure function of chain and config. Never mutates the chain.
    pub fn scan(self, chain: &[EnrichedContract], config: &ScannerConfig) -> Vec<Signal> {
        match self {
            Self::Iv => iv::scan(chain, config),
            Self::Uoa => uoa::scan(chain, config),
            Self::DeltaBucket => delta::scan(chain, config),
            Self::Mispricing => mispricing::scan(chain, config),
            Self::SpreadQuality => spread::scan(chain, config),
        }
    }
}

impl std::fmt::Display for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Signals ──

/// One flagged contract from one scanner. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub scanner: Scanner,
    pub ticker: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub option_type: OptionType,
    pub tag: &'static str,
    pub payload: SignalPayload,
}

impl Signal {
    pub fn new(
        scanner: Scanner,
        contract: &EnrichedContract,
        tag: &'static str,
        payload: SignalPayload,
    ) -> Self {
        Self {
            scanner,
            ticker: contract.contract.ticker.clone(),
            expiry: contract.contract.expiry,
            strike: contract.contract.strike,
            option_type: contract.contract.option_type,
            tag,
            payload,
        }
    }
}

/// Scanner-specific measurements behind a signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalPayload {
    ImpliedVol {
        direction: iv::IvDirection,
        implied_vol: f64,
        threshold: f64,
        /// |iv - threshold| / threshold
        excess: f64,
    },
    Activity {
        volume: u64,
        open_interest: u64,
        volume_oi_ratio: f64,
    },
    Delta {
        delta: f64,
        bucket: delta::DeltaBucket,
    },
    Mispricing {
        market_price: f64,
        theoretical_price: f64,
        deviation: f64,
    },
    Spread {
        bid: f64,
        ask: f64,
        spread: f64,
        relative_spread: f64,
        volume: u64,
        open_interest: u64,
    },
}

impl SignalPayload {
    /// One-line human summary for console reports.
    pub fn summary(&self) -> String {
        match self {
            Self::ImpliedVol { implied_vol, threshold, excess, .. } => format!(
                "iv {:.1}% vs {:.1}% ({:+.0}%)",
                implied_vol * 100.0,
                threshold * 100.0,
                excess * 100.0
            ),
            Self::Activity { volume, open_interest, volume_oi_ratio } => {
                format!("vol {volume} / oi {open_interest} = {volume_oi_ratio:.2}x")
            }
            Self::Delta { delta, .. } => format!("delta {delta:+.3}"),
            Self::Mispricing { market_price, theoretical_price, deviation } => format!(
                "mkt {market_price:.2} vs theo {theoretical_price:.2} ({:+.1}%)",
                deviation * 100.0
            ),
            Self::Spread { spread, relative_spread, .. } => {
                format!("spread {spread:.2} ({:.1}% of mid)", relative_spread * 100.0)
            }
        }
    }
}

/// Run every scanner over the same chain, in declaration order.
/// Large chains fan out across the rayon pool, one task per scanner.
pub fn run_all(chain: &[EnrichedContract], config: &ScannerConfig) -> Vec<(Scanner, Vec<Signal>)> {
    if chain.len() < PARALLEL_MIN_CONTRACTS {
        return Scanner::ALL.iter().map(|&s| (s, s.scan(chain, config))).collect();
    }

    // Indexed collect keeps declaration order
    Scanner::ALL
        .par_iter()
        .map(|&s| (s, s.scan(chain, config)))
        .collect()
}
