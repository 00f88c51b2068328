use super::{Scanner, Signal, SignalPayload};
use crate::chain::types::EnrichedContract;
use crate::config::ScannerConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IvDirection {
    Low,
    High,
}

impl IvDirection {
    /// Cheap vol is a buy candidate, rich vol a sell candidate.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Low => "BUY_VOL",
            Self::High => "SELL_VOL",
        }
    }
}

/// Flags implied vol below the low threshold or above the high one.
/// Contracts with unresolved IV are skipped.
pub fn scan(chain: &[EnrichedContract], config: &ScannerConfig) -> Vec<Signal> {
    chain
        .iter()
        .filter_map(|c| {
            let iv = c.implied_vol?;
            if config.iv_min_volume > 0 && c.contract.volume < config.iv_min_volume {
                return None;
            }

            let (direction, threshold) = if iv < config.iv_low_threshold {
                (IvDirection::Low, config.iv_low_threshold)
            } else if iv > config.iv_high_threshold {
                (IvDirection::High, config.iv_high_threshold)
            } else {
                return None;
            };

            // threshold > 0 on both branches: iv >= 0 can't be below a zero low
            let excess = (iv - threshold).abs() / threshold;

            Some(Signal::new(
                Scanner::Iv,
                c,
                direction.tag(),
                SignalPayload::ImpliedVol { direction, implied_vol: iv, threshold, excess },
            ))
        })
        .collect()
}
