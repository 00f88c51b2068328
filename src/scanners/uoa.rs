use super::{Scanner, Signal, SignalPayload};
use crate::chain::types::EnrichedContract;
use crate::config::ScannerConfig;

/// Unusual options activity: today's volume above standing open interest,
/// with both above their minimums. Read as fresh positioning rather than
/// closing flow. Needs no pricing output.
pub fn scan(chain: &[EnrichedContract], config: &ScannerConfig) -> Vec<Signal> {
    chain
        .iter()
        .filter_map(|c| {
            let volume = c.contract.volume;
            let open_interest = c.contract.open_interest;

            let unusual = volume > open_interest
                && volume > config.min_volume
                && open_interest > config.min_open_interest;
            if !unusual {
                return None;
            }

            Some(Signal::new(
                Scanner::Uoa,
                c,
                "UOA_HIGH_VOL",
                SignalPayload::Activity {
                    volume,
                    open_interest,
                    // open_interest > min_open_interest >= 0
                    volume_oi_ratio: volume as f64 / open_interest as f64,
                },
            ))
        })
        .collect()
}
