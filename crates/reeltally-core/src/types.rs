//! Shared domain types
//!
//! The two label payloads ([`ReelRecord`], [`PalletDeclaration`]), the session
//! mode, and the reconciliation verdict. All of these are plain data; the
//! session lifecycle lives in [`crate::session`] and the comparisons in
//! [`crate::reconcile`].

use core::fmt;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Reel Record
// ----------------------------------------------------------------------------

/// One decoded reel label.
///
/// Immutable once decoded. Structural equality over all three fields is the
/// dedup key within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReelRecord {
    /// Reformatted production order, e.g. `P552-1234567`
    pub production_order: String,
    /// Reformatted reel number, e.g. `5-1234`
    pub reel_number: String,
    /// Variable count field, kept as scanned
    pub var_count: String,
}

// ----------------------------------------------------------------------------
// Pallet Declaration
// ----------------------------------------------------------------------------

/// One `(reel number, count)` entry on a pallet label.
///
/// Items that carried no ` / ` separator on the label keep the raw token as
/// the reel number with an empty count; such entries can never match a reel
/// record, so a malformed label reconciles to a mismatch instead of a panic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PalletItem {
    pub reel_number: String,
    pub var_count: String,
}

impl fmt::Display for PalletItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.var_count.is_empty() {
            write!(f, "{}", self.reel_number)
        } else {
            write!(f, "{} / {}", self.reel_number, self.var_count)
        }
    }
}

/// One decoded pallet label: a production order plus the reels it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletDeclaration {
    pub production_order: String,
    /// Declared contents in label order
    pub items: Vec<PalletItem>,
}

// ----------------------------------------------------------------------------
// Scan Mode
// ----------------------------------------------------------------------------

/// Mode of the single process-wide scan session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    #[default]
    Idle,
    ScanningReels,
    ScanningPallet,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Idle => write!(f, "idle"),
            ScanMode::ScanningReels => write!(f, "scanning-reels"),
            ScanMode::ScanningPallet => write!(f, "scanning-pallet"),
        }
    }
}

// ----------------------------------------------------------------------------
// Reconciliation Verdict
// ----------------------------------------------------------------------------

/// Outcome of a reconciliation check.
///
/// Produced by [`crate::reconcile`], consumed once by signal writing and
/// report emission, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every record in the closed reel batch carries the same production order
    OrdersConsistent,
    /// At least one record disagrees with the first record's production order
    OrdersInconsistent {
        expected: String,
        offenders: Vec<ReelRecord>,
    },
    /// The retained reel batch and the pallet declaration list the same
    /// `(reel number, count)` pairs
    PalletMatch,
    /// The retained batch and the declaration disagree
    PalletMismatch {
        /// Pairs scanned as reels but absent from the pallet label
        missing_from_pallet: Vec<PalletItem>,
        /// Pairs the pallet label declares but the batch never scanned
        unexpected_on_pallet: Vec<PalletItem>,
    },
    /// A pallet label arrived with no successfully closed reel batch retained
    PalletQueueEmpty,
}

impl Verdict {
    /// Whether this verdict counts as a successful reconciliation
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::OrdersConsistent | Verdict::PalletMatch)
    }
}
