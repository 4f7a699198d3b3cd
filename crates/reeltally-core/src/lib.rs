//! Reeltally Core
//!
//! This crate provides the pure domain logic for the reeltally line station:
//! decoding the two label formats produced by the reel and pallet printers,
//! owning the single active scan session, and reconciling a closed reel batch
//! against itself and against a pallet declaration.
//!
//! Everything here is I/O-free. Talking to the controller, the scanner device,
//! and the report/alert collaborators is the job of `reeltally-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod label;
pub mod reconcile;
pub mod report;
pub mod session;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{
    ControllerConfig, OutputSignal, ReportConfig, RetryConfig, ScannerConfig, SignalMap,
    StationConfig,
};
pub use errors::{DecodeError, LinkError, ReeltallyError};
pub use label::{classify, decode_pallet, decode_reel, ScannedLabel};
pub use reconcile::{verify_against_pallet, verify_production_orders};
pub use report::{reel_mismatch_alert, pallet_mismatch_alert, ReportRow, RowStatus};
pub use session::{AddOutcome, SessionStore, StartOutcome};
pub use types::{PalletDeclaration, PalletItem, ReelRecord, ScanMode, Verdict};

pub type Result<T> = core::result::Result<T, ReeltallyError>;
