use super::{Scanner, Signal, SignalPayload};
use crate::chain::types::EnrichedContract;
use crate::config::ScannerConfig;

/// Relative deviation of market price from theoretical value.
///
/// deviation = (market - theoretical) / theoretical
///
/// Skips contracts with unresolved IV, no theoretical price, or a
/// theoretical price too small to divide by.
pub fn scan(chain: &[EnrichedContract], config: &ScannerConfig) -> Vec<Signal> {
    chain
        .iter()
        .filter_map(|c| {
            c.implied_vol?;
            let theoretical_price = c.theoretical_price?;
            if !(theoretical_price > config.min_theoretical_price) {
                return None;
            }
            let market_price = c.market_price?;

            let deviation = (market_price - theoretical_price) / theoretical_price;
            if deviation.abs() <= config.mispricing_threshold {
                return None;
            }

            let tag = if deviation > 0.0 { "OVERPRICED" } else { "UNDERPRICED" };
            Some(Signal::new(
                Scanner::Mispricing,
                c,
                tag,
                SignalPayload::Mispricing { market_price, theoretical_price, deviation },
            ))
        })
        .collect()
}
