//! Error types for reeltally
//!
//! Nothing in this taxonomy is fatal: decode failures leave the session
//! untouched, link failures are retried forever by the supervisor, and
//! invariant violations (starting a session while one is active) are ignored
//! and logged. The process is designed to run unattended.

// ----------------------------------------------------------------------------
// Decode Errors
// ----------------------------------------------------------------------------

/// A scanned string could not be decoded as a reel label.
///
/// Pallet decoding is total and never produces one of these; a string that
/// fails reel decoding is assumed to be a pallet label (see [`crate::classify`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Second dash not found")]
    SecondDashMissing,
    #[error("Marker not found")]
    MarkerMissing,
    #[error("Label truncated: expected {expected} chars after marker, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("Reel number prefix is not numeric: {0:?}")]
    BadReelPrefix(String),
}

// ----------------------------------------------------------------------------
// Link Errors
// ----------------------------------------------------------------------------

/// A controller or scanner link failed.
///
/// Always recoverable: the supervisor tears the link down and rebuilds it on a
/// fixed backoff. In-memory session state survives the disconnect.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Controller link is not connected")]
    NotConnected,
    #[error("Fieldbus exception: function {function:#04x}, code {code:#04x}")]
    Exception { function: u8, code: u8 },
    #[error("Malformed fieldbus frame: {0}")]
    BadFrame(String),
    #[error("Response transaction id {got} does not match request {expected}")]
    TransactionMismatch { expected: u16, got: u16 },
    #[error("Scanner device not present at {path}")]
    DeviceAbsent { path: String },
    #[error("Scanner device closed the stream")]
    DeviceClosed,
}

// ----------------------------------------------------------------------------
// Unified Error
// ----------------------------------------------------------------------------

/// Top-level error for reeltally operations
#[derive(Debug, thiserror::Error)]
pub enum ReeltallyError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Link error: {0}")]
    Link(#[from] LinkError),
    #[error("Configuration error: {0}")]
    Config(String),
}
