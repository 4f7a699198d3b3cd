//! Scanner device reader
//!
//! The label reader presents decoded scans as newline-terminated lines on a
//! character device or FIFO. Opening the path doubles as the presence probe:
//! while the open fails the supervisor keeps the `device-offline` coil
//! asserted and retries once a second.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use reeltally_core::LinkError;
use reeltally_runtime::{ScanSource, ScannerConnector};

/// Opens the configured device node
pub struct LineScannerConnector {
    path: PathBuf,
}

impl LineScannerConnector {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ScannerConnector for LineScannerConnector {
    type Source = LineScanner;

    async fn open(&self) -> Result<LineScanner, LinkError> {
        let file = File::open(&self.path)
            .await
            .map_err(|_| LinkError::DeviceAbsent {
                path: self.path.display().to_string(),
            })?;
        info!(path = %self.path.display(), "scanner device opened");
        Ok(LineScanner {
            reader: BufReader::new(file),
        })
    }
}

/// One open scanner device; dropped (with any partial line) on error
pub struct LineScanner {
    reader: BufReader<File>,
}

#[async_trait]
impl ScanSource for LineScanner {
    async fn next_scan(&mut self) -> Result<String, LinkError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(LinkError::DeviceClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_terminator_delimited_scans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "SCAN-ONE").unwrap();
        writeln!(file, "SCAN-TWO\r").unwrap();

        let connector = LineScannerConnector::new(path);
        let mut source = connector.open().await.unwrap();
        assert_eq!(source.next_scan().await.unwrap(), "SCAN-ONE");
        assert_eq!(source.next_scan().await.unwrap(), "SCAN-TWO");
        assert!(matches!(
            source.next_scan().await,
            Err(LinkError::DeviceClosed)
        ));
    }

    #[tokio::test]
    async fn absent_device_reports_as_such() {
        let connector = LineScannerConnector::new(PathBuf::from("/nonexistent/scanner"));
        assert!(matches!(
            connector.open().await,
            Err(LinkError::DeviceAbsent { .. })
        ));
    }
}
