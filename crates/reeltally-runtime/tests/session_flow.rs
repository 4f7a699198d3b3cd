//! End-to-end session flow against scripted controller and scanner stubs
//!
//! Drives the real poller, ingestor, and supervisor with in-memory devices:
//! a coil/register map standing in for the controller and a channel-backed
//! scan source standing in for the label reader. Time is paused; tokio
//! auto-advances through the poll and backoff sleeps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use reeltally_core::{
    LinkError, ReportRow, RetryConfig, RowStatus, ScanMode, SessionStore, SignalMap,
};
use reeltally_runtime::{
    signal_channel, spawn_collaborators, AlertSink, ControllerConnector, ControllerLink, Ingestor,
    Poller, ReportSink, ScanLog, ScanSource, ScannerConnector, Supervisor,
};

// ----------------------------------------------------------------------------
// Controller stub
// ----------------------------------------------------------------------------

#[derive(Default)]
struct LinkState {
    inputs: HashMap<u16, bool>,
    coil_writes: Vec<(u16, bool)>,
    register_writes: Vec<(u16, u16)>,
    /// When set, writing a coil also updates the sampled input, the way the
    /// controller program consumes the scan-complete bit
    writes_feed_inputs: bool,
}

#[derive(Clone, Default)]
struct StubLink {
    state: Arc<Mutex<LinkState>>,
}

impl StubLink {
    fn reactive() -> Self {
        let link = Self::default();
        link.state.lock().unwrap().writes_feed_inputs = true;
        link
    }

    fn set_input(&self, address: u16, value: bool) {
        self.state.lock().unwrap().inputs.insert(address, value);
    }

    fn coil_writes(&self, address: u16) -> Vec<bool> {
        self.state
            .lock()
            .unwrap()
            .coil_writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, v)| *v)
            .collect()
    }

    fn register_writes(&self, address: u16) -> Vec<u16> {
        self.state
            .lock()
            .unwrap()
            .register_writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, v)| *v)
            .collect()
    }
}

#[async_trait]
impl ControllerLink for StubLink {
    async fn read_coil(&mut self, address: u16) -> Result<bool, LinkError> {
        Ok(*self.state.lock().unwrap().inputs.get(&address).unwrap_or(&false))
    }

    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), LinkError> {
        let mut state = self.state.lock().unwrap();
        state.coil_writes.push((address, value));
        if state.writes_feed_inputs {
            state.inputs.insert(address, value);
        }
        Ok(())
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), LinkError> {
        self.state.lock().unwrap().register_writes.push((address, value));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Scanner stub
// ----------------------------------------------------------------------------

struct ChannelSource {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl ScanSource for ChannelSource {
    async fn next_scan(&mut self) -> Result<String, LinkError> {
        self.rx.recv().await.ok_or(LinkError::DeviceClosed)
    }
}

// ----------------------------------------------------------------------------
// Collaborator stubs
// ----------------------------------------------------------------------------

#[derive(Default)]
struct Captured {
    rows: Mutex<Vec<ReportRow>>,
    alerts: Mutex<Vec<String>>,
    scans: Mutex<Vec<String>>,
}

#[async_trait]
impl ReportSink for Captured {
    async fn append(&self, row: &ReportRow) -> std::io::Result<()> {
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

#[async_trait]
impl AlertSink for Captured {
    async fn request(&self, subject: &str, _body: &str) -> std::io::Result<()> {
        self.alerts.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

#[async_trait]
impl ScanLog for Captured {
    async fn append(&self, raw: &str) -> std::io::Result<()> {
        self.scans.lock().unwrap().push(raw.to_string());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

// Decodes to order P552-2345678, reel 5-1234 / 5-1235, count 18000.
const REEL_A: &str = "01-23-ABCD18000FNC10355212345678051234";
const REEL_B: &str = "01-23-ABCD18000FNC10355212345678051235";
// Declares both reels under the same order.
const PALLET_OK: &str = "5522345678 5-1234 / 18000, 5-1235 / 18000";
// Declares only one of them.
const PALLET_SHORT: &str = "5522345678 5-1234 / 18000";

struct Harness {
    link: StubLink,
    scans: mpsc::UnboundedSender<String>,
    captured: Arc<Captured>,
    store: Arc<SessionStore>,
    signals: SignalMap,
}

fn spawn_harness() -> Harness {
    let link = StubLink::reactive();
    let captured = Arc::new(Captured::default());
    let (outputs, _) = spawn_collaborators(captured.clone(), captured.clone(), captured.clone());
    let store = Arc::new(SessionStore::new());
    let signals = SignalMap::default();
    let (signal_tx, mut signal_rx) = signal_channel();

    let mut poller = Poller::new(
        store.clone(),
        signals.clone(),
        outputs.clone(),
        Duration::from_millis(10),
        1,
    );
    let mut poll_link = link.clone();
    tokio::spawn(async move { poller.run(&mut poll_link, &mut signal_rx).await });

    let (scan_tx, scan_rx) = mpsc::unbounded_channel();
    let mut ingestor = Ingestor::new(store.clone(), signal_tx, outputs, 1);
    tokio::spawn(async move {
        let mut source = ChannelSource { rx: scan_rx };
        ingestor.run(&mut source).await
    });

    Harness {
        link,
        scans: scan_tx,
        captured,
        store,
        signals,
    }
}

/// Let the paused clock run until both loops have gone around a few times
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn reel_batch_then_matching_pallet() {
    let h = spawn_harness();

    // Operator starts a reel session.
    h.link.set_input(h.signals.start_reels, true);
    settle().await;
    assert_eq!(h.store.mode(), ScanMode::ScanningReels);
    assert_eq!(h.link.register_writes(h.signals.live_count), vec![0]);
    h.link.set_input(h.signals.start_reels, false);

    // Two distinct reels, one rescan.
    for raw in [REEL_A, REEL_B, REEL_A] {
        h.scans.send(raw.to_string()).unwrap();
    }
    settle().await;
    assert_eq!(h.link.register_writes(h.signals.live_count), vec![0, 1, 2]);
    assert_eq!(h.captured.scans.lock().unwrap().len(), 3);

    // Batch closes consistent.
    h.link.set_input(h.signals.scan_complete, true);
    settle().await;
    assert_eq!(h.store.mode(), ScanMode::Idle);
    assert_eq!(h.link.coil_writes(h.signals.orders_ok), vec![true]);
    assert!(h.link.coil_writes(h.signals.orders_bad).is_empty());
    // Edge-consumed: the bit was written back false.
    assert_eq!(h.link.coil_writes(h.signals.scan_complete), vec![false]);

    // Pallet session against the retained batch.
    h.link.set_input(h.signals.start_pallet, true);
    settle().await;
    assert_eq!(h.store.mode(), ScanMode::ScanningPallet);
    h.link.set_input(h.signals.start_pallet, false);

    h.scans.send(PALLET_OK.to_string()).unwrap();
    settle().await;
    assert_eq!(h.store.mode(), ScanMode::Idle);
    assert_eq!(h.link.coil_writes(h.signals.pallet_match), vec![true]);
    assert!(h.link.coil_writes(h.signals.pallet_mismatch).is_empty());

    let rows = h.captured.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, RowStatus::Success);
    assert_eq!(rows[0].production_order_pallet, "P552-2345678");
    assert!(h.captured.alerts.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn pallet_mismatch_raises_alert() {
    let h = spawn_harness();

    h.link.set_input(h.signals.start_reels, true);
    settle().await;
    h.link.set_input(h.signals.start_reels, false);
    for raw in [REEL_A, REEL_B] {
        h.scans.send(raw.to_string()).unwrap();
    }
    settle().await;
    h.link.set_input(h.signals.scan_complete, true);
    settle().await;

    h.link.set_input(h.signals.start_pallet, true);
    settle().await;
    h.link.set_input(h.signals.start_pallet, false);
    h.scans.send(PALLET_SHORT.to_string()).unwrap();
    settle().await;

    assert_eq!(h.link.coil_writes(h.signals.pallet_mismatch), vec![true]);
    let rows = h.captured.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, RowStatus::Fail);
    assert_eq!(
        h.captured.alerts.lock().unwrap().as_slice(),
        ["Reel and Pallet Data Mismatch Detected"]
    );
}

#[tokio::test(start_paused = true)]
async fn inconsistent_orders_emit_report_row() {
    let h = spawn_harness();

    h.link.set_input(h.signals.start_reels, true);
    settle().await;
    h.link.set_input(h.signals.start_reels, false);

    // Same reel field, different order field.
    let other_order = "01-23-ABCD18000FNC10399912345678051236";
    for raw in [REEL_A, other_order] {
        h.scans.send(raw.to_string()).unwrap();
    }
    settle().await;
    h.link.set_input(h.signals.scan_complete, true);
    settle().await;

    assert_eq!(h.link.coil_writes(h.signals.orders_bad), vec![true]);
    assert!(h.link.coil_writes(h.signals.orders_ok).is_empty());
    let rows = h.captured.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, RowStatus::Fail);
    assert!(rows[0].production_order_pallet.is_empty());
}

#[tokio::test(start_paused = true)]
async fn pallet_without_retained_batch_is_queue_empty() {
    let h = spawn_harness();

    h.link.set_input(h.signals.start_pallet, true);
    settle().await;
    h.link.set_input(h.signals.start_pallet, false);
    h.scans.send(PALLET_OK.to_string()).unwrap();
    settle().await;

    assert_eq!(h.link.coil_writes(h.signals.pallet_mismatch), vec![true]);
    let rows = h.captured.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, RowStatus::Fail);
    assert!(rows[0].reel_numbers.is_empty());
    // No retained batch means no mismatch alert, just the row and the coil.
    assert!(h.captured.alerts.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scan_complete_held_high_closes_once() {
    let h = spawn_harness();

    h.link.set_input(h.signals.start_reels, true);
    settle().await;
    h.link.set_input(h.signals.start_reels, false);
    h.scans.send(REEL_A.to_string()).unwrap();
    settle().await;

    // A link whose writes do not clear the input: the bit stays high across
    // many polls. The edge detector must still close the batch exactly once.
    h.link.state.lock().unwrap().writes_feed_inputs = false;
    h.link.set_input(h.signals.scan_complete, true);
    settle().await;
    settle().await;

    assert_eq!(h.link.coil_writes(h.signals.orders_ok), vec![true]);
}

#[tokio::test(start_paused = true)]
async fn duplicate_start_does_not_reset_counter() {
    let h = spawn_harness();

    h.link.set_input(h.signals.start_reels, true);
    settle().await;
    h.scans.send(REEL_A.to_string()).unwrap();
    settle().await;

    // start-reels still high on later polls: no second counter reset.
    settle().await;
    assert_eq!(h.link.register_writes(h.signals.live_count), vec![0, 1]);
    assert_eq!(h.store.mode(), ScanMode::ScanningReels);
}

// ----------------------------------------------------------------------------
// Supervisor scenarios
// ----------------------------------------------------------------------------

struct StubControllerConnector {
    link: StubLink,
}

#[async_trait]
impl ControllerConnector for StubControllerConnector {
    type Link = StubLink;
    async fn connect(&self) -> Result<StubLink, LinkError> {
        Ok(self.link.clone())
    }
}

struct FlakyScannerConnector {
    remaining_failures: Arc<Mutex<u32>>,
    rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<String>>>>,
}

#[async_trait]
impl ScannerConnector for FlakyScannerConnector {
    type Source = ChannelSource;
    async fn open(&self) -> Result<ChannelSource, LinkError> {
        let mut remaining = self.remaining_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(LinkError::DeviceAbsent {
                path: "stub".to_string(),
            });
        }
        let rx = self.rx.lock().unwrap().take().ok_or(LinkError::DeviceClosed)?;
        Ok(ChannelSource { rx })
    }
}

#[tokio::test(start_paused = true)]
async fn supervisor_signals_device_offline_until_found() {
    let link = StubLink::reactive();
    let captured = Arc::new(Captured::default());
    let (outputs, _) = spawn_collaborators(captured.clone(), captured.clone(), captured.clone());
    let store = Arc::new(SessionStore::new());
    let signals = SignalMap::default();

    let (scan_tx, scan_rx) = mpsc::unbounded_channel();
    let supervisor = Supervisor::new(
        StubControllerConnector { link: link.clone() },
        FlakyScannerConnector {
            remaining_failures: Arc::new(Mutex::new(2)),
            rx: Arc::new(Mutex::new(Some(scan_rx))),
        },
        store.clone(),
        signals.clone(),
        outputs,
        RetryConfig::default(),
        Duration::from_millis(10),
        1,
    );
    tokio::spawn(supervisor.run());

    // Two failed probes, then the device opens.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let offline = link.coil_writes(signals.device_offline);
    assert_eq!(offline, vec![true, true, false]);

    // The reopened device feeds the ingestion loop as usual.
    store.try_start(ScanMode::ScanningReels);
    scan_tx.send(REEL_A.to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(link.register_writes(signals.live_count), vec![1]);
}
