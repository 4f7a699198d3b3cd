//! Scan ingestion loop
//!
//! Blocks on the next terminator-delimited scan and routes it through the
//! session store according to the current mode. Every scan, decodable or
//! not, goes to the audit log first. All controller writes leave through
//! the signal channel; reconciliation and emission happen strictly after the
//! store's critical section has returned.

use std::sync::Arc;

use tracing::{debug, info, warn};

use reeltally_core::{
    classify, pallet_mismatch_alert, verify_against_pallet, AddOutcome, LinkError, OutputSignal,
    PalletDeclaration, ReelRecord, ReportRow, ScanMode, ScannedLabel, SessionStore, Verdict,
};

use crate::collaborators::Outputs;
use crate::link::{ScanSource, SignalTx};

// ----------------------------------------------------------------------------
// Ingestor
// ----------------------------------------------------------------------------

/// The scanner-facing half of the session machine.
///
/// Like the [`Poller`](crate::Poller), the ingestor survives device loss;
/// the source is lent in per [`run`](Ingestor::run) and a reopened device
/// always starts with a fresh read buffer.
pub struct Ingestor {
    store: Arc<SessionStore>,
    signals: SignalTx,
    outputs: Outputs,
    station: u32,
}

impl Ingestor {
    pub fn new(store: Arc<SessionStore>, signals: SignalTx, outputs: Outputs, station: u32) -> Self {
        Self {
            store,
            signals,
            outputs,
            station,
        }
    }

    /// Consume scans until the device fails. A partially received scan at
    /// the moment of failure is discarded with the source.
    pub async fn run<S: ScanSource>(&mut self, source: &mut S) -> Result<(), LinkError> {
        loop {
            let raw = source.next_scan().await?;
            self.outputs.scan(raw.clone());

            match self.store.mode() {
                ScanMode::ScanningReels => self.ingest_reel(&raw),
                ScanMode::ScanningPallet => self.ingest_pallet(&raw),
                ScanMode::Idle => {
                    debug!("scan received while idle, logged only");
                }
            }
        }
    }

    fn ingest_reel(&self, raw: &str) {
        match classify(raw) {
            ScannedLabel::Reel(record) => match self.store.add_reel_if_new(record) {
                AddOutcome::Added { count } => {
                    self.signals.live_count(count as u16);
                }
                AddOutcome::Duplicate | AddOutcome::Inactive => {
                    // No signal change for duplicates; Inactive can only
                    // happen if the controller closed the session mid-scan.
                }
            },
            ScannedLabel::Pallet(_) => {
                debug!("non-reel label during reel session ignored");
            }
        }
    }

    fn ingest_pallet(&self, raw: &str) {
        // A reel label during a pallet session is ignored; only a string
        // that fails reel decoding is treated as the pallet declaration.
        let declaration = match classify(raw) {
            ScannedLabel::Reel(_) => {
                debug!("reel label during pallet session ignored");
                return;
            }
            ScannedLabel::Pallet(declaration) => declaration,
        };

        let batch: Vec<ReelRecord> = self.store.close_pallet_session();
        let verdict = if batch.is_empty() {
            Verdict::PalletQueueEmpty
        } else {
            verify_against_pallet(&batch, &declaration)
        };

        self.settle_pallet(&batch, &declaration, &verdict);
    }

    fn settle_pallet(
        &self,
        batch: &[ReelRecord],
        declaration: &PalletDeclaration,
        verdict: &Verdict,
    ) {
        match verdict {
            Verdict::PalletMatch => {
                info!(order = %declaration.production_order, "pallet matches retained batch");
                self.signals.assert(OutputSignal::PalletMatch);
            }
            Verdict::PalletMismatch { .. } => {
                warn!(order = %declaration.production_order, "pallet does not match retained batch");
                self.signals.assert(OutputSignal::PalletMismatch);
                let (subject, body) = pallet_mismatch_alert(batch, declaration);
                self.outputs.alert(subject, body);
            }
            Verdict::PalletQueueEmpty => {
                warn!(order = %declaration.production_order, "pallet scanned with no retained reel batch");
                self.signals.assert(OutputSignal::PalletMismatch);
            }
            Verdict::OrdersConsistent | Verdict::OrdersInconsistent { .. } => {
                // Not produced by pallet reconciliation.
            }
        }
        self.outputs
            .report(ReportRow::pallet_closed(batch, declaration, verdict, self.station));
    }
}
