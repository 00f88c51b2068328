use super::ReportSink;
use crate::aggregator::{SignalRow, SignalTable};
use crate::errors::{ScanError, ScanResult};
use crate::scanners::Scanner;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writes one pretty-printed JSON document per ticker and run.
pub struct JsonReportSink {
    dir: PathBuf,
    run_id: Uuid,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    run_id: String,
    ticker: &'a str,
    generated_at: DateTime<Utc>,
    counts: BTreeMap<&'static str, usize>,
    rows: &'a [SignalRow],
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>, run_id: Uuid) -> Self {
        Self { dir: dir.into(), run_id }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str, at: DateTime<Utc>) -> PathBuf {
        let run = self.run_id.simple().to_string();
        self.dir.join(format!(
            "{}_signals_{}_{}.json",
            ticker.to_ascii_uppercase(),
            at.format("%Y%m%d_%H%M%S"),
            &run[..8]
        ))
    }
}

impl ReportSink for JsonReportSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write(&self, ticker: &str, table: &SignalTable) -> ScanResult<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ScanError::Report(format!("create {}: {e}", self.dir.display())))?;

        let now = Utc::now();
        let doc = ReportDocument {
            run_id: self.run_id.to_string(),
            ticker,
            generated_at: now,
            counts: table
                .counts()
                .into_iter()
                .map(|(s, n): (Scanner, usize)| (s.name(), n))
                .collect(),
            rows: &table.rows,
        };

        let path = self.path_for(ticker, now);
        let file = std::fs::File::create(&path)
            .map_err(|e| ScanError::Report(format!("create {}: {e}", path.display())))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &doc)?;
        writer.flush()?;

        tracing::info!(ticker = %ticker, rows = table.len(), path = %path.display(), "saved signals report");
        Ok(())
    }
}
