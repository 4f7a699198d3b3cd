//! Centralized configuration
//!
//! Everything that varies per deployment lives here: the controller's signal
//! addresses, link endpoints, poll and backoff intervals, and report
//! locations. The defaults are the values of the line the system was built
//! for; the binary layers a TOML file and flag overrides on top.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Signal Map
// ----------------------------------------------------------------------------

/// Controller coil and register addresses for every signal the core drives
/// or samples. Addresses are deployment configuration, not behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalMap {
    /// Input coil: begin a reel-scanning session
    pub start_reels: u16,
    /// Input coil: operator finished the reel batch (edge-consumed)
    pub scan_complete: u16,
    /// Input coil: begin a pallet-scanning session
    pub start_pallet: u16,
    /// Output coil: closed reel batch had consistent production orders
    pub orders_ok: u16,
    /// Output coil: closed reel batch had inconsistent production orders
    pub orders_bad: u16,
    /// Output coil: pallet declaration matched the retained batch
    pub pallet_match: u16,
    /// Output coil: pallet declaration did not match
    pub pallet_mismatch: u16,
    /// Output register: running count of distinct reels in the current batch
    pub live_count: u16,
    /// Output coil: asserted while the scanner device is unreachable
    pub device_offline: u16,
}

/// Output signals the core drives, addressed symbolically so callers never
/// touch raw coil numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSignal {
    OrdersOk,
    OrdersBad,
    PalletMatch,
    PalletMismatch,
    DeviceOffline,
}

impl SignalMap {
    /// Coil address carrying the given output signal
    pub fn output_coil(&self, signal: OutputSignal) -> u16 {
        match signal {
            OutputSignal::OrdersOk => self.orders_ok,
            OutputSignal::OrdersBad => self.orders_bad,
            OutputSignal::PalletMatch => self.pallet_match,
            OutputSignal::PalletMismatch => self.pallet_mismatch,
            OutputSignal::DeviceOffline => self.device_offline,
        }
    }
}

impl Default for SignalMap {
    fn default() -> Self {
        Self {
            start_reels: 8,
            scan_complete: 12,
            start_pallet: 40,
            orders_ok: 14,
            orders_bad: 16,
            pallet_match: 42,
            pallet_mismatch: 44,
            live_count: 10,
            device_offline: 55,
        }
    }
}

// ----------------------------------------------------------------------------
// Link Configuration
// ----------------------------------------------------------------------------

/// Fieldbus link to the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    /// Input sampling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.7".to_string(),
            port: 502,
            unit_id: 1,
            poll_interval_ms: 1000,
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Label-scanner device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Device node or FIFO presenting terminator-delimited scans
    pub device_path: PathBuf,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/reeltally-scanner"),
        }
    }
}

// ----------------------------------------------------------------------------
// Retry Policy
// ----------------------------------------------------------------------------

/// Fixed-backoff reconnect policy shared by both loops.
///
/// Deliberately simple: no retry cap, no exponential growth, no circuit
/// breaker. The station retries until the device comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before rebuilding a failed controller link, in seconds
    pub controller_backoff_secs: u64,
    /// Delay between scanner-presence probes, in seconds
    pub scanner_probe_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            controller_backoff_secs: 5,
            scanner_probe_secs: 1,
        }
    }
}

impl RetryConfig {
    pub fn controller_backoff(&self) -> Duration {
        Duration::from_secs(self.controller_backoff_secs)
    }

    pub fn scanner_probe(&self) -> Duration {
        Duration::from_secs(self.scanner_probe_secs)
    }
}

// ----------------------------------------------------------------------------
// Reporting
// ----------------------------------------------------------------------------

/// Report, scan-log, and alert-outbox locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Daily report files land here; monthly files in a `monthly` subfolder
    pub reports_dir: PathBuf,
    /// Append-only raw-scan audit log
    pub scan_log: PathBuf,
    /// Alert requests are appended here for the mail relay to pick up
    pub alert_outbox: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            scan_log: PathBuf::from("scan_data.log"),
            alert_outbox: PathBuf::from("alert_outbox.log"),
        }
    }
}

/// Identity of this scan station, stamped on every report row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub station: u32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self { station: 1 }
    }
}
