pub mod fixture;
pub mod polygon;

use crate::chain::types::Contract;
use crate::errors::ScanResult;
use async_trait::async_trait;

/// Source of option-chain snapshots.
/// Returns contracts in provider order; an empty chain is a valid answer.
#[async_trait]
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_chain(&self, ticker: &str) -> ScanResult<Vec<Contract>>;
}
