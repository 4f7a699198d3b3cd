//! External collaborators: report sink, alert sink, scan log
//!
//! Fire-and-forget from the core's perspective. Both loops hand their
//! emissions to an unbounded channel; a dedicated task forwards them to the
//! sink implementations, so a slow disk or mail relay can never stall a
//! session transition. Sink failures are logged and otherwise ignored.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use reeltally_core::ReportRow;

// ----------------------------------------------------------------------------
// Sink Traits
// ----------------------------------------------------------------------------

/// Persists one row per completed or failed session
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn append(&self, row: &ReportRow) -> std::io::Result<()>;
}

/// Requests a mismatch notification
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn request(&self, subject: &str, body: &str) -> std::io::Result<()>;
}

/// Append-only raw-scan audit log
#[async_trait]
pub trait ScanLog: Send + Sync {
    async fn append(&self, raw: &str) -> std::io::Result<()>;
}

// ----------------------------------------------------------------------------
// Fan-out
// ----------------------------------------------------------------------------

/// One emission from the core loops
#[derive(Debug, Clone)]
pub enum OutputEvent {
    Report(ReportRow),
    Alert { subject: String, body: String },
    Scan(String),
}

/// Cloneable handle the loops emit through
#[derive(Debug, Clone)]
pub struct Outputs {
    tx: mpsc::UnboundedSender<OutputEvent>,
}

impl Outputs {
    pub fn report(&self, row: ReportRow) {
        self.send(OutputEvent::Report(row));
    }

    pub fn alert(&self, subject: String, body: String) {
        self.send(OutputEvent::Alert { subject, body });
    }

    pub fn scan(&self, raw: String) {
        self.send(OutputEvent::Scan(raw));
    }

    fn send(&self, event: OutputEvent) {
        if self.tx.send(event).is_err() {
            warn!("collaborator channel closed, emission dropped");
        }
    }
}

/// Spawn the forwarding task. The handles never need joining; the task runs
/// until every [`Outputs`] clone is dropped.
pub fn spawn_collaborators(
    reports: Arc<dyn ReportSink>,
    alerts: Arc<dyn AlertSink>,
    scan_log: Arc<dyn ScanLog>,
) -> (Outputs, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                OutputEvent::Report(row) => {
                    debug!(?row.status, "appending report row");
                    if let Err(e) = reports.append(&row).await {
                        warn!(error = %e, "report sink failed");
                    }
                }
                OutputEvent::Alert { subject, body } => {
                    if let Err(e) = alerts.request(&subject, &body).await {
                        warn!(error = %e, "alert sink failed");
                    }
                }
                OutputEvent::Scan(raw) => {
                    if let Err(e) = scan_log.append(&raw).await {
                        warn!(error = %e, "scan log failed");
                    }
                }
            }
        }
    });
    (Outputs { tx }, handle)
}
