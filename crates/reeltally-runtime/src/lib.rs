//! Reeltally Runtime
//!
//! Merges the two independently clocked event sources of the station (the
//! periodically polled controller and the asynchronously arriving scan
//! stream) into the single session owned by `reeltally-core`. The shape is
//! deliberate:
//!
//! - the [`Poller`] owns the fieldbus link outright; every other component
//!   writes output signals through an mpsc command channel the poller drains
//!   each tick, so the ingestion loop never blocks on controller I/O;
//! - the [`Ingestor`] blocks on the scanner and routes each scan through the
//!   session store by mode;
//! - report rows, alerts, and scan-log lines fan out through another channel
//!   to the collaborator task, so neither loop ever waits on slow sinks;
//! - the [`Supervisor`] rebuilds either link forever on a fixed backoff.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod collaborators;
pub mod ingest;
pub mod link;
pub mod poller;
pub mod supervisor;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use collaborators::{spawn_collaborators, AlertSink, OutputEvent, Outputs, ReportSink, ScanLog};
pub use ingest::Ingestor;
pub use link::{signal_channel, ControllerLink, ScanSource, SignalCommand, SignalTx};
pub use poller::Poller;
pub use supervisor::{ControllerConnector, ScannerConnector, Supervisor};
