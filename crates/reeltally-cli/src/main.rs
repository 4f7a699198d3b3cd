//! reeltally - reel/pallet scan reconciliation station

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use reeltally_core::SessionStore;
use reeltally_fieldbus::ModbusConnector;
use reeltally_runtime::{spawn_collaborators, Supervisor};

mod cli;
mod config;
mod scanner;
mod sinks;

use cli::Cli;
use config::AppConfig;
use scanner::LineScannerConnector;
use sinks::{CsvReportSink, FileScanLog, OutboxAlertSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            AppConfig::load_from_file(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(host) = cli.host {
        config.controller.host = host;
    }
    if let Some(device) = cli.device {
        config.scanner.device_path = device;
    }

    info!(
        controller = %config.controller.host,
        scanner = %config.scanner.device_path.display(),
        station = config.station.station,
        "reeltally starting"
    );

    let reports = Arc::new(CsvReportSink::new(config.reports.reports_dir.clone()));
    let alerts = Arc::new(OutboxAlertSink::new(config.reports.alert_outbox.clone()));
    let scan_log = Arc::new(FileScanLog::new(config.reports.scan_log.clone()));
    let (outputs, _collaborators) = spawn_collaborators(reports, alerts, scan_log);

    let supervisor = Supervisor::new(
        ModbusConnector::new(config.controller.clone()),
        LineScannerConnector::new(config.scanner.device_path.clone()),
        Arc::new(SessionStore::new()),
        config.signals.clone(),
        outputs,
        config.retry.clone(),
        config.controller.poll_interval(),
        config.station.station,
    );

    // Runs until the process is killed.
    supervisor.run().await;
    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
