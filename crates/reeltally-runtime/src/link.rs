//! Device-facing traits and the signal-write channel
//!
//! The runtime talks to hardware only through these seams: a coil/register
//! view of the controller and a terminator-delimited stream of scans. The
//! concrete Modbus client lives in `reeltally-fieldbus`; the scanner reader
//! in the binary.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use reeltally_core::{LinkError, OutputSignal};

// ----------------------------------------------------------------------------
// Controller Link
// ----------------------------------------------------------------------------

/// Coil/register primitives of the industrial controller.
///
/// Exactly the surface the session machine needs, nothing more; this is not
/// a general fieldbus client. Any error tears the link down for the
/// supervisor to rebuild.
#[async_trait]
pub trait ControllerLink: Send {
    async fn read_coil(&mut self, address: u16) -> Result<bool, LinkError>;
    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), LinkError>;
    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), LinkError>;
}

// ----------------------------------------------------------------------------
// Scan Source
// ----------------------------------------------------------------------------

/// Stream of terminator-delimited scanned strings from the label reader.
///
/// `next_scan` blocks until the next complete scan. On disconnect the source
/// is discarded along with any partial buffer; the supervisor probes for the
/// device and opens a fresh one.
#[async_trait]
pub trait ScanSource: Send {
    async fn next_scan(&mut self) -> Result<String, LinkError>;
}

// ----------------------------------------------------------------------------
// Signal Commands
// ----------------------------------------------------------------------------

/// Output-signal write requested by a component that does not own the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalCommand {
    SetCoil { signal: OutputSignal, value: bool },
    /// Push the live distinct-reel count to the progress register
    LiveCount(u16),
}

/// Cloneable sender half of the signal channel
#[derive(Debug, Clone)]
pub struct SignalTx {
    tx: mpsc::UnboundedSender<SignalCommand>,
}

impl SignalTx {
    pub fn assert(&self, signal: OutputSignal) {
        self.send(SignalCommand::SetCoil {
            signal,
            value: true,
        });
    }

    pub fn clear(&self, signal: OutputSignal) {
        self.send(SignalCommand::SetCoil {
            signal,
            value: false,
        });
    }

    pub fn live_count(&self, count: u16) {
        self.send(SignalCommand::LiveCount(count));
    }

    fn send(&self, command: SignalCommand) {
        // Only fails at shutdown when the poller side is gone.
        if self.tx.send(command).is_err() {
            warn!(?command, "signal channel closed, command dropped");
        }
    }
}

/// Create the signal channel: senders for the ingestion loop and supervisor,
/// receiver for the poller.
pub fn signal_channel() -> (SignalTx, mpsc::UnboundedReceiver<SignalCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SignalTx { tx }, rx)
}
