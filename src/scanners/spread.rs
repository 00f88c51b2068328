use super::{Scanner, Signal, SignalPayload};
use crate::chain::types::EnrichedContract;
use crate::config::ScannerConfig;

/// Liquid contracts with a tight market: volume and open interest at or
/// above the minimums, and (ask - bid) / mid below the tightness threshold.
/// Needs both quotes; needs no pricing output.
pub fn scan(chain: &[EnrichedContract], config: &ScannerConfig) -> Vec<Signal> {
    chain
        .iter()
        .filter_map(|c| {
            let volume = c.contract.volume;
            let open_interest = c.contract.open_interest;
            if volume < config.min_volume || open_interest < config.min_open_interest {
                return None;
            }

            let (bid, ask) = (c.contract.bid?, c.contract.ask?);
            let mid = c.mid?;
            let spread = ask - bid;
            let relative_spread = spread / mid;
            if !(relative_spread < config.spread_tightness) {
                return None;
            }

            Some(Signal::new(
                Scanner::SpreadQuality,
                c,
                "HIGH_QUALITY",
                SignalPayload::Spread { bid, ask, spread, relative_spread, volume, open_interest },
            ))
        })
        .collect()
}
