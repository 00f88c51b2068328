use super::DataProvider;
use crate::chain::types::Contract;
use crate::errors::{ScanError, ScanResult};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads recorded snapshots from `{dir}/{TICKER}.json` (a JSON array of contracts).
/// Deterministic, offline; a ticker without a file has an empty chain.
pub struct FixtureProvider {
    dir: PathBuf,
}

impl FixtureProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.json", ticker.to_ascii_uppercase()))
    }
}

#[async_trait]
impl DataProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_chain(&self, ticker: &str) -> ScanResult<Vec<Contract>> {
        let path = self.path_for(ticker);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(ticker = %ticker, path = %path.display(), "no fixture, empty chain");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ScanError::Io(format!("read {}: {e}", path.display())));
            }
        };

        serde_json::from_str(&raw)
            .map_err(|e| ScanError::Parse(format!("{}: {e}", path.display())))
    }
}
