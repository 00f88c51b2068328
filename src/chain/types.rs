use crate::models::Greeks;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Raw contract ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Value if exercised immediately.
    #[inline]
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// One option contract as delivered by a data provider. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub ticker: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub option_type: OptionType,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub last: Option<f64>,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub open_interest: u64,
    /// Underlying spot at snapshot time.
    pub spot: f64,
    /// Provider-quoted implied volatility, when the feed carries one.
    #[serde(default)]
    pub vendor_iv: Option<f64>,
    /// OCC option symbol, e.g. O:SPY261218C00600000.
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Contract {
    /// (bid + ask) / 2 when both quotes are present and positive.
    #[inline]
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) if b > 0.0 && a > 0.0 => Some((b + a) / 2.0),
            _ => None,
        }
    }

    /// Mid if quoted, otherwise a positive last trade.
    #[inline]
    pub fn market_price(&self) -> Option<f64> {
        self.mid().or(self.last.filter(|p| *p > 0.0 && p.is_finite()))
    }
}

// ── Enriched contract ──

/// A contract with pricing-model output attached. Built once by the enricher.
///
/// `implied_vol` and `greeks` are both present or both absent: a failed
/// solve leaves the record unevaluable for vol-dependent scanners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedContract {
    pub contract: Contract,
    pub ttl_years: f64,
    pub mid: Option<f64>,
    pub market_price: Option<f64>,
    pub implied_vol: Option<f64>,
    pub greeks: Option<Greeks>,
    /// Volatility the theoretical price was evaluated at.
    pub reference_vol: Option<f64>,
    pub theoretical_price: Option<f64>,
}

impl EnrichedContract {
    #[inline]
    pub fn delta(&self) -> Option<f64> {
        self.greeks.map(|g| g.delta)
    }
}
