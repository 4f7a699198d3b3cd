//! Reconciliation of a closed reel batch
//!
//! Two pure checks: internal consistency of the batch's production orders,
//! and cross consistency between the batch and a pallet declaration. Both
//! return a [`Verdict`] carrying enough detail for report rows and alerts.

use std::collections::BTreeSet;

use crate::types::{PalletDeclaration, PalletItem, ReelRecord, Verdict};

// ----------------------------------------------------------------------------
// Internal Consistency
// ----------------------------------------------------------------------------

/// Check that every record in `batch` carries the same production order.
///
/// An empty batch is vacuously consistent. The inconsistent verdict carries
/// the order expected (the first record's) and every disagreeing record.
pub fn verify_production_orders(batch: &[ReelRecord]) -> Verdict {
    let Some(first) = batch.first() else {
        return Verdict::OrdersConsistent;
    };
    let offenders: Vec<ReelRecord> = batch
        .iter()
        .filter(|r| r.production_order != first.production_order)
        .cloned()
        .collect();
    if offenders.is_empty() {
        Verdict::OrdersConsistent
    } else {
        Verdict::OrdersInconsistent {
            expected: first.production_order.clone(),
            offenders,
        }
    }
}

// ----------------------------------------------------------------------------
// Cross Consistency
// ----------------------------------------------------------------------------

/// Compare the retained reel batch against a pallet declaration.
///
/// Batch records whose production order equals the declaration's form set A
/// of `(reel number, count)` pairs; the declaration's items form set B. The
/// verdict is a match iff A == B as sets: order-independent, duplicates
/// collapse. Records with a *different* production order are silently
/// excluded from A rather than flagged; that behavior is carried over from
/// the deployed system as-is (see DESIGN.md).
pub fn verify_against_pallet(batch: &[ReelRecord], declaration: &PalletDeclaration) -> Verdict {
    let scanned: BTreeSet<(&str, &str)> = batch
        .iter()
        .filter(|r| r.production_order == declaration.production_order)
        .map(|r| (r.reel_number.as_str(), r.var_count.as_str()))
        .collect();
    let declared: BTreeSet<(&str, &str)> = declaration
        .items
        .iter()
        .map(|i| (i.reel_number.as_str(), i.var_count.as_str()))
        .collect();

    if scanned == declared {
        return Verdict::PalletMatch;
    }

    let to_item = |(reel, count): &(&str, &str)| PalletItem {
        reel_number: reel.to_string(),
        var_count: count.to_string(),
    };
    Verdict::PalletMismatch {
        missing_from_pallet: scanned.difference(&declared).map(to_item).collect(),
        unexpected_on_pallet: declared.difference(&scanned).map(to_item).collect(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
