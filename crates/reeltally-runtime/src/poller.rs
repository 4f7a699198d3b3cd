//! Controller poll loop
//!
//! Samples the three input signals once per poll interval and drives the
//! session transitions they request. The poller is the only component that
//! touches the fieldbus link; queued [`SignalCommand`]s from the ingestion
//! loop and supervisor are drained at the top of every tick so the link has
//! a single owner.
//!
//! `scan-complete` is handled as a rising edge: the previous sample is
//! remembered, so a bit held high across two ticks cannot close the same
//! batch twice, even though the poller also writes the bit back false the
//! way the controller program expects.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};

use reeltally_core::{
    reel_mismatch_alert, verify_production_orders, LinkError, ReelRecord, ReportRow, ScanMode,
    SessionStore, SignalMap, StartOutcome, Verdict,
};

use crate::collaborators::Outputs;
use crate::link::{ControllerLink, SignalCommand};

// ----------------------------------------------------------------------------
// Poller
// ----------------------------------------------------------------------------

/// The controller-facing half of the session machine.
///
/// Owns everything that must survive a link reconnect (edge-detector state
/// included); the link itself is lent in per [`run`](Poller::run) so the
/// supervisor can rebuild it without losing the poller.
pub struct Poller {
    store: Arc<SessionStore>,
    signals: SignalMap,
    outputs: Outputs,
    poll_interval: Duration,
    station: u32,
    prev_scan_complete: bool,
}

impl Poller {
    pub fn new(
        store: Arc<SessionStore>,
        signals: SignalMap,
        outputs: Outputs,
        poll_interval: Duration,
        station: u32,
    ) -> Self {
        Self {
            store,
            signals,
            outputs,
            poll_interval,
            station,
            prev_scan_complete: false,
        }
    }

    /// Poll until the link fails. Session state is untouched by a failure;
    /// the supervisor reconnects and calls `run` again.
    pub async fn run<C: ControllerLink>(
        &mut self,
        link: &mut C,
        commands: &mut mpsc::UnboundedReceiver<SignalCommand>,
    ) -> Result<(), LinkError> {
        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;
            self.drain_commands(link, commands).await?;
            self.sample_inputs(link).await?;
        }
    }

    /// Apply queued output writes from components that do not own the link
    async fn drain_commands<C: ControllerLink>(
        &mut self,
        link: &mut C,
        commands: &mut mpsc::UnboundedReceiver<SignalCommand>,
    ) -> Result<(), LinkError> {
        while let Ok(command) = commands.try_recv() {
            match command {
                SignalCommand::SetCoil { signal, value } => {
                    link.write_coil(self.signals.output_coil(signal), value)
                        .await?;
                }
                SignalCommand::LiveCount(count) => {
                    link.write_register(self.signals.live_count, count).await?;
                }
            }
        }
        Ok(())
    }

    async fn sample_inputs<C: ControllerLink>(&mut self, link: &mut C) -> Result<(), LinkError> {
        if link.read_coil(self.signals.start_reels).await? {
            if self.store.try_start(ScanMode::ScanningReels) == StartOutcome::Started {
                // Fresh batch: reset the operator-visible counter.
                link.write_register(self.signals.live_count, 0).await?;
            }
        }

        let complete = link.read_coil(self.signals.scan_complete).await?;
        let rising = complete && !self.prev_scan_complete;
        self.prev_scan_complete = complete;
        if rising {
            // Edge-consume before doing anything slow.
            link.write_coil(self.signals.scan_complete, false).await?;
            self.close_reel_batch(link).await?;
        }

        if link.read_coil(self.signals.start_pallet).await? {
            // No counter reset: a pallet session consumes the retained
            // batch, not a freshly accumulated one.
            self.store.try_start(ScanMode::ScanningPallet);
        }

        Ok(())
    }

    async fn close_reel_batch<C: ControllerLink>(
        &mut self,
        link: &mut C,
    ) -> Result<(), LinkError> {
        let batch: Vec<ReelRecord> = self.store.close_reel_session();
        if batch.is_empty() {
            return Ok(());
        }

        match verify_production_orders(&batch) {
            Verdict::OrdersConsistent => {
                info!(records = batch.len(), "production orders consistent");
                link.write_coil(self.signals.orders_ok, true).await?;
                self.store.record_successful_batch(batch);
            }
            Verdict::OrdersInconsistent { expected, offenders } => {
                warn!(
                    %expected,
                    offenders = offenders.len(),
                    "production orders inconsistent"
                );
                link.write_coil(self.signals.orders_bad, true).await?;
                self.outputs
                    .report(ReportRow::reel_batch_failed(&batch, self.station));
                let (subject, body) = reel_mismatch_alert(&batch);
                self.outputs.alert(subject, body);
            }
            other => {
                // verify_production_orders only returns the two order verdicts.
                warn!(?other, "unexpected verdict for reel batch");
            }
        }
        Ok(())
    }
}
