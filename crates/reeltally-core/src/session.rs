//! The single process-wide scan session
//!
//! Both runtime loops (controller poller and scan ingestion) call into one
//! [`SessionStore`]. Every operation takes the internal lock exactly once, so
//! neither loop can observe a half-applied transition. No operation performs
//! I/O or blocks on anything but the lock itself; callers snapshot first and
//! talk to collaborators after the lock is released.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::types::{ReelRecord, ScanMode};

// ----------------------------------------------------------------------------
// Operation Outcomes
// ----------------------------------------------------------------------------

/// Outcome of a session start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session is already active; the request is ignored, never queued
    AlreadyActive,
}

/// Outcome of offering a decoded reel record to the current batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Record appended; carries the new distinct-record count for the
    /// controller's progress register
    Added { count: usize },
    /// A structurally equal record is already in the batch
    Duplicate,
    /// No reel session is active
    Inactive,
}

// ----------------------------------------------------------------------------
// Session Store
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SessionState {
    mode: ScanMode,
    /// Insertion-ordered, deduplicated by structural equality
    batch: Vec<ReelRecord>,
    started_at: Option<DateTime<Utc>>,
    /// Most recent successfully closed reel batch, kept across Idle so a
    /// later pallet session can be verified against it
    last_completed: Vec<ReelRecord>,
}

/// Mutex-guarded owner of the scan session and the retained batch
#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode snapshot, for the ingestion loop's routing
    pub fn mode(&self) -> ScanMode {
        self.state.lock().expect("session lock poisoned").mode
    }

    /// Transition Idle → `mode`. While a session is active this is a logged
    /// no-op: attempts are ignored, not queued.
    pub fn try_start(&self, mode: ScanMode) -> StartOutcome {
        let mut state = self.state.lock().expect("session lock poisoned");
        if state.mode != ScanMode::Idle {
            warn!(current = %state.mode, requested = %mode, "session already active, start ignored");
            return StartOutcome::AlreadyActive;
        }
        state.mode = mode;
        state.batch.clear();
        state.started_at = Some(Utc::now());
        info!(%mode, "scan session started");
        StartOutcome::Started
    }

    /// Append `record` to the batch unless a structurally equal record is
    /// already present. Only meaningful while scanning reels.
    pub fn add_reel_if_new(&self, record: ReelRecord) -> AddOutcome {
        let mut state = self.state.lock().expect("session lock poisoned");
        if state.mode != ScanMode::ScanningReels {
            return AddOutcome::Inactive;
        }
        if state.batch.contains(&record) {
            debug!(?record, "duplicate reel record ignored");
            return AddOutcome::Duplicate;
        }
        state.batch.push(record);
        AddOutcome::Added {
            count: state.batch.len(),
        }
    }

    /// Atomically snapshot and clear the batch and return to Idle.
    ///
    /// An empty snapshot is a valid outcome ("no reels scanned"); the close
    /// also resets a session left open in any other mode, mirroring the
    /// controller's unconditional scan-complete reset.
    pub fn close_reel_session(&self) -> Vec<ReelRecord> {
        let mut state = self.state.lock().expect("session lock poisoned");
        let batch = std::mem::take(&mut state.batch);
        state.mode = ScanMode::Idle;
        state.started_at = None;
        info!(records = batch.len(), "reel session closed");
        batch
    }

    /// Close a pallet session, returning the retained batch from the last
    /// successful reel close. Pallet sessions never accumulate reel records
    /// of their own.
    pub fn close_pallet_session(&self) -> Vec<ReelRecord> {
        let mut state = self.state.lock().expect("session lock poisoned");
        state.mode = ScanMode::Idle;
        state.batch.clear();
        state.started_at = None;
        info!(retained = state.last_completed.len(), "pallet session closed");
        state.last_completed.clone()
    }

    /// Retain `batch` for the next pallet session. Called only when a reel
    /// batch closed with internally consistent production orders.
    pub fn record_successful_batch(&self, batch: Vec<ReelRecord>) {
        let mut state = self.state.lock().expect("session lock poisoned");
        state.last_completed = batch;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
