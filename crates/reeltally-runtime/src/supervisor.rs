//! Supervision and reconnect policy
//!
//! Both loops share one retry shape: on failure, sleep a fixed backoff and
//! rebuild the device, forever. No retry cap, no exponential growth, no
//! circuit breaker: an unattended station keeps trying until the hardware
//! comes back. While the scanner is absent the `device-offline` coil is held
//! asserted through the signal channel and cleared the moment a device
//! opens.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use reeltally_core::{LinkError, OutputSignal, RetryConfig, SessionStore, SignalMap};

use crate::collaborators::Outputs;
use crate::ingest::Ingestor;
use crate::link::{signal_channel, ControllerLink, ScanSource, SignalTx};
use crate::poller::Poller;

// ----------------------------------------------------------------------------
// Connectors
// ----------------------------------------------------------------------------

/// Builds controller links for the poll loop
#[async_trait]
pub trait ControllerConnector: Send + Sync + 'static {
    type Link: ControllerLink;
    async fn connect(&self) -> Result<Self::Link, LinkError>;
}

/// Probes for and opens the scanner device
#[async_trait]
pub trait ScannerConnector: Send + Sync + 'static {
    type Source: ScanSource;
    async fn open(&self) -> Result<Self::Source, LinkError>;
}

// ----------------------------------------------------------------------------
// Supervisor
// ----------------------------------------------------------------------------

/// Runs the poll and ingestion loops for the lifetime of the process
pub struct Supervisor<CC, SC> {
    controller: CC,
    scanner: SC,
    store: Arc<SessionStore>,
    signals: SignalMap,
    outputs: Outputs,
    retry: RetryConfig,
    poll_interval: std::time::Duration,
    station: u32,
}

impl<CC, SC> Supervisor<CC, SC>
where
    CC: ControllerConnector,
    SC: ScannerConnector,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        controller: CC,
        scanner: SC,
        store: Arc<SessionStore>,
        signals: SignalMap,
        outputs: Outputs,
        retry: RetryConfig,
        poll_interval: std::time::Duration,
        station: u32,
    ) -> Self {
        Self {
            controller,
            scanner,
            store,
            signals,
            outputs,
            retry,
            poll_interval,
            station,
        }
    }

    /// Spawn both loops and wait on them. Neither loop returns under normal
    /// operation; this only resolves if a task panics.
    pub async fn run(self) {
        let (signal_tx, signal_rx) = signal_channel();

        let controller_task = tokio::spawn(Self::supervise_controller(
            self.controller,
            Poller::new(
                Arc::clone(&self.store),
                self.signals.clone(),
                self.outputs.clone(),
                self.poll_interval,
                self.station,
            ),
            signal_rx,
            self.retry.clone(),
        ));

        let scanner_task = tokio::spawn(Self::supervise_scanner(
            self.scanner,
            Ingestor::new(
                Arc::clone(&self.store),
                signal_tx.clone(),
                self.outputs.clone(),
                self.station,
            ),
            signal_tx,
            self.retry.clone(),
        ));

        let (controller, scanner) = tokio::join!(controller_task, scanner_task);
        if let Err(e) = controller {
            error!(error = %e, "controller loop aborted");
        }
        if let Err(e) = scanner {
            error!(error = %e, "ingestion loop aborted");
        }
    }

    async fn supervise_controller(
        connector: CC,
        mut poller: Poller,
        mut signal_rx: mpsc::UnboundedReceiver<crate::link::SignalCommand>,
        retry: RetryConfig,
    ) {
        loop {
            match connector.connect().await {
                Ok(mut link) => {
                    info!("controller link established");
                    if let Err(e) = poller.run(&mut link, &mut signal_rx).await {
                        warn!(error = %e, "controller link failed");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "controller connect failed");
                }
            }
            sleep(retry.controller_backoff()).await;
        }
    }

    async fn supervise_scanner(
        connector: SC,
        mut ingestor: Ingestor,
        signal_tx: SignalTx,
        retry: RetryConfig,
    ) {
        let mut was_offline = false;
        loop {
            match connector.open().await {
                Ok(mut source) => {
                    info!("scanner device opened");
                    signal_tx.clear(OutputSignal::DeviceOffline);
                    was_offline = false;
                    if let Err(e) = ingestor.run(&mut source).await {
                        warn!(error = %e, "scanner device failed, reprobing");
                    }
                }
                Err(e) => {
                    if !was_offline {
                        warn!(error = %e, "scanner device absent");
                    }
                    signal_tx.assert(OutputSignal::DeviceOffline);
                    was_offline = true;
                }
            }
            sleep(retry.scanner_probe()).await;
        }
    }
}
