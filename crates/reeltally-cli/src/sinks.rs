//! File-backed collaborator implementations
//!
//! Report rows land in daily and monthly CSV files, alert requests in an
//! outbox file a mail relay can drain, raw scans in an append-only audit
//! log. All of these run on the collaborator fan-out task, so their I/O
//! never delays a session transition.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use reeltally_core::{ReportRow, RowStatus};
use reeltally_runtime::{AlertSink, ReportSink, ScanLog};

// ----------------------------------------------------------------------------
// CSV Reports
// ----------------------------------------------------------------------------

const REPORT_HEADER: [&str; 8] = [
    "Date Time",
    "Production Order Reels",
    "Reel Numbers",
    "Var Counts",
    "Production Order Pallet",
    "Pallet Contents",
    "Status",
    "Station",
];

/// Appends every row to the current daily file and the current monthly file
pub struct CsvReportSink {
    reports_dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    fn daily_path(&self) -> PathBuf {
        self.reports_dir
            .join(format!("{}.csv", Utc::now().format("%Y-%m-%d")))
    }

    fn monthly_path(&self) -> PathBuf {
        self.reports_dir
            .join("monthly")
            .join(format!("{}.csv", Utc::now().format("%Y-%m")))
    }

    fn append_to(path: &Path, row: &ReportRow) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let fresh = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::Writer::from_writer(file);
        if fresh {
            writer.write_record(REPORT_HEADER)?;
        }
        writer.write_record([
            row.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            row.production_order_reels.clone(),
            row.reel_numbers.clone(),
            row.var_counts.clone(),
            row.production_order_pallet.clone(),
            row.pallet_contents.clone(),
            match row.status {
                RowStatus::Success => "Success".to_string(),
                RowStatus::Fail => "Fail".to_string(),
            },
            row.station.to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn append(&self, row: &ReportRow) -> std::io::Result<()> {
        Self::append_to(&self.daily_path(), row)?;
        Self::append_to(&self.monthly_path(), row)
    }
}

// ----------------------------------------------------------------------------
// Alert Outbox
// ----------------------------------------------------------------------------

/// Appends alert requests to an outbox file; delivery is somebody else's job
pub struct OutboxAlertSink {
    path: PathBuf,
}

impl OutboxAlertSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl AlertSink for OutboxAlertSink {
    async fn request(&self, subject: &str, body: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{} - Subject: {subject}\n{body}\n---",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

// ----------------------------------------------------------------------------
// Scan Log
// ----------------------------------------------------------------------------

/// Timestamped raw-scan audit log
pub struct FileScanLog {
    path: PathBuf,
}

impl FileScanLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ScanLog for FileScanLog {
    async fn append(&self, raw: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} - {raw}", Utc::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_row() -> ReportRow {
        ReportRow {
            timestamp: Utc::now(),
            production_order_reels: "P552-2345678".to_string(),
            reel_numbers: "5-1234, 5-1235".to_string(),
            var_counts: "18000, 18000".to_string(),
            production_order_pallet: "P552-2345678".to_string(),
            pallet_contents: "5-1234 / 18000, 5-1235 / 18000".to_string(),
            status: RowStatus::Success,
            station: 1,
        }
    }

    #[tokio::test]
    async fn writes_daily_and_monthly_files_with_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvReportSink::new(dir.path().to_path_buf());

        sink.append(&sample_row()).await.unwrap();
        sink.append(&sample_row()).await.unwrap();

        let daily = std::fs::read_to_string(sink.daily_path()).unwrap();
        assert_eq!(daily.lines().count(), 3);
        assert!(daily.starts_with("Date Time,"));
        // Quoted because the joined fields contain commas.
        assert!(daily.contains("\"5-1234, 5-1235\""));

        let monthly = std::fs::read_to_string(sink.monthly_path()).unwrap();
        assert_eq!(monthly.lines().count(), 3);
    }

    #[tokio::test]
    async fn scan_log_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileScanLog::new(dir.path().join("scan_data.log"));
        log.append("RAW1").await.unwrap();
        log.append("RAW2").await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("scan_data.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("- RAW1"));
        assert!(lines[1].ends_with("- RAW2"));
    }

    #[tokio::test]
    async fn outbox_keeps_subject_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutboxAlertSink::new(dir.path().join("outbox.log"));
        sink.request("Mismatch", "details here").await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("outbox.log")).unwrap();
        assert!(contents.contains("Subject: Mismatch"));
        assert!(contents.contains("details here"));
    }
}
