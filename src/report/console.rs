use super::ReportSink;
use crate::aggregator::SignalTable;
use crate::errors::ScanResult;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Prints the head of each table to stdout.
pub struct ConsoleReportSink {
    max_rows: usize,
}

#[derive(Tabled)]
struct ConsoleRow {
    scanner: &'static str,
    expiry: String,
    strike: String,
    #[tabled(rename = "type")]
    option_type: String,
    tag: &'static str,
    detail: String,
}

impl ConsoleReportSink {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    pub fn render(&self, table: &SignalTable) -> String {
        let rows = table.rows.iter().take(self.max_rows).map(|r| ConsoleRow {
            scanner: r.scanner.name(),
            expiry: r.expiry.to_string(),
            strike: format!("{:.2}", r.strike),
            option_type: r.option_type.to_string(),
            tag: r.tag,
            detail: r.payload.summary(),
        });

        let mut out = format!(
            "--- TOP SIGNALS FOR {} ({} of {}) ---\n",
            table.ticker,
            table.len().min(self.max_rows),
            table.len()
        );
        out.push_str(&Table::new(rows).with(Style::psql()).to_string());
        out
    }
}

impl Default for ConsoleReportSink {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ReportSink for ConsoleReportSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, _ticker: &str, table: &SignalTable) -> ScanResult<()> {
        println!("\n{}", self.render(table));
        Ok(())
    }
}
