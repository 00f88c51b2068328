pub mod console;
pub mod json;

use crate::aggregator::SignalTable;
use crate::errors::ScanResult;

/// Destination for per-ticker signal tables.
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn write(&self, ticker: &str, table: &SignalTable) -> ScanResult<()>;
}
