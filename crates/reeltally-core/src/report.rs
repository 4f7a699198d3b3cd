//! Report rows and alert bodies
//!
//! One row per completed or failed session, in the tabular shape the plant
//! reports expect, plus the rendered text bodies for mismatch alerts. Pure
//! formatting; persistence and delivery belong to the collaborators wired up
//! by the binary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PalletDeclaration, ReelRecord, Verdict};

// ----------------------------------------------------------------------------
// Report Rows
// ----------------------------------------------------------------------------

/// Success/fail flag of a report row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Success,
    Fail,
}

/// One row of the session report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub timestamp: DateTime<Utc>,
    pub production_order_reels: String,
    /// Comma-joined reel numbers of the batch
    pub reel_numbers: String,
    /// Comma-joined var counts of the batch
    pub var_counts: String,
    pub production_order_pallet: String,
    /// Comma-joined pallet content items
    pub pallet_contents: String,
    pub status: RowStatus,
    pub station: u32,
}

impl ReportRow {
    /// Row for a reel batch that closed with inconsistent production orders.
    /// No pallet was involved, so the pallet columns stay empty.
    pub fn reel_batch_failed(batch: &[ReelRecord], station: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            production_order_reels: first_order(batch),
            reel_numbers: join(batch.iter().map(|r| r.reel_number.as_str())),
            var_counts: join(batch.iter().map(|r| r.var_count.as_str())),
            production_order_pallet: String::new(),
            pallet_contents: String::new(),
            status: RowStatus::Fail,
            station,
        }
    }

    /// Row for a closed pallet session, tagged with the reconciliation
    /// verdict. The batch may be empty when no reel session was retained.
    pub fn pallet_closed(
        batch: &[ReelRecord],
        declaration: &PalletDeclaration,
        verdict: &Verdict,
        station: u32,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            production_order_reels: first_order(batch),
            reel_numbers: join(batch.iter().map(|r| r.reel_number.as_str())),
            var_counts: join(batch.iter().map(|r| r.var_count.as_str())),
            production_order_pallet: declaration.production_order.clone(),
            pallet_contents: declaration
                .items
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            status: if verdict.is_success() {
                RowStatus::Success
            } else {
                RowStatus::Fail
            },
            station,
        }
    }
}

fn first_order(batch: &[ReelRecord]) -> String {
    batch
        .first()
        .map(|r| r.production_order.clone())
        .unwrap_or_default()
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(", ")
}

// ----------------------------------------------------------------------------
// Alert Bodies
// ----------------------------------------------------------------------------

/// Subject and body for a reel-batch consistency alert
pub fn reel_mismatch_alert(batch: &[ReelRecord]) -> (String, String) {
    let subject = "Reel Data Mismatch Notification".to_string();

    let mut body = String::from("Reel Data Summary:\n\n");
    body.push_str(&format!("Timestamp: {}\n\n", Utc::now().format("%Y-%m-%d %H:%M:%S")));

    let first = first_order(batch);
    let mismatches: Vec<&ReelRecord> = batch
        .iter()
        .filter(|r| r.production_order != first)
        .collect();
    if mismatches.is_empty() {
        body.push_str("No mismatches detected.\n\n");
    } else {
        body.push_str(&format!(
            "Total Mismatches: {} found out of {} reels.\n\n",
            mismatches.len(),
            batch.len()
        ));
    }

    for (idx, reel) in batch.iter().enumerate() {
        body.push_str(&format!(
            "Reel {}:\nProduction Order: {}\nReel Number: {}\nVar Count: {}\n\n",
            idx + 1,
            reel.production_order,
            reel.reel_number,
            reel.var_count
        ));
    }

    if !mismatches.is_empty() {
        body.push_str("Mismatched Production Orders:\n\n");
        for reel in &mismatches {
            body.push_str(&format!(
                "Production Order: {} (Mismatched)\nReel Number: {}\nVar Count: {}\n\n",
                reel.production_order, reel.reel_number, reel.var_count
            ));
        }
    }

    body.push_str("Please review the above data and take the necessary actions.\n");
    (subject, body)
}

/// Subject and body for a reel/pallet cross-consistency alert
pub fn pallet_mismatch_alert(batch: &[ReelRecord], declaration: &PalletDeclaration) -> (String, String) {
    let subject = "Reel and Pallet Data Mismatch Detected".to_string();

    let mut body = String::from(
        "A mismatch has been detected between the reel data and pallet data. \
         Please review the details below:\n\n",
    );

    let order_reels = if batch.is_empty() {
        "N/A".to_string()
    } else {
        first_order(batch)
    };
    if order_reels != declaration.production_order {
        body.push_str("*** Production Order Mismatch! ***\n");
        body.push_str(&format!("Production Order from Reel Data: {order_reels}\n"));
        body.push_str(&format!(
            "Production Order from Pallet Data: {}\n\n",
            declaration.production_order
        ));
    } else {
        body.push_str(&format!(
            "Production Order: {} (Matches in both Reel and Pallet)\n\n",
            declaration.production_order
        ));
    }

    body.push_str("Reel Data:\n");
    for (idx, reel) in batch.iter().enumerate() {
        body.push_str(&format!(
            "Reel {}:\n- Reel Number: {}\n- Var Count: {}\n\n",
            idx + 1,
            reel.reel_number,
            reel.var_count
        ));
    }

    body.push_str("Pallet Data:\n");
    body.push_str(&format!("Production Order: {}\n", declaration.production_order));
    body.push_str("Pallet Contents:\n");
    for item in &declaration.items {
        body.push_str(&format!("- {item}\n"));
    }

    body.push_str("\nThe reel and pallet data mismatch requires immediate attention.\n");
    (subject, body)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
