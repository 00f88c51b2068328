use super::{Scanner, Signal, SignalPayload};
use crate::chain::types::EnrichedContract;
use crate::config::ScannerConfig;
use serde::Serialize;

/// Risk bucket by |delta|. Each bucket is closed below and open above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeltaBucket {
    Lotto,
    Sensible,
    Directional,
    DeepItm,
}

impl DeltaBucket {
    /// `edges` are the lower edges of Sensible, Directional and Deep ITM.
    /// Total over [0, inf): anything at or past the last edge is Deep ITM.
    #[inline]
    pub fn classify(abs_delta: f64, edges: &[f64; 3]) -> Self {
        if abs_delta < edges[0] {
            Self::Lotto
        } else if abs_delta < edges[1] {
            Self::Sensible
        } else if abs_delta < edges[2] {
            Self::Directional
        } else {
            Self::DeepItm
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lotto => "LOTTO",
            Self::Sensible => "SENSIBLE",
            Self::Directional => "DIRECTIONAL",
            Self::DeepItm => "DEEP_ITM",
        }
    }
}

/// Classifies every contract with a resolved delta, not only outliers.
pub fn scan(chain: &[EnrichedContract], config: &ScannerConfig) -> Vec<Signal> {
    chain
        .iter()
        .filter_map(|c| {
            let delta = c.delta().filter(|d| d.is_finite())?;
            let bucket = DeltaBucket::classify(delta.abs(), &config.delta_bucket_edges);
            Some(Signal::new(
                Scanner::DeltaBucket,
                c,
                bucket.label(),
                SignalPayload::Delta { delta, bucket },
            ))
        })
        .collect()
}
