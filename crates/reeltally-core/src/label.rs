//! Label decoding for the two barcode formats in use
//!
//! The reel printer and the pallet printer emit visually similar labels with
//! no explicit type marker. The only reliable discriminator is that a reel
//! label decodes and a pallet label does not, so [`classify`] always attempts
//! reel decoding first and falls back to pallet decoding. Callers route
//! through [`classify`]; the individual decoders stay public for tests and
//! for a future explicit tag.
//!
//! Both decoders are pure and total: [`decode_reel`] returns a tagged failure
//! instead of panicking on malformed input, and [`decode_pallet`] always
//! produces a declaration (malformed items become count-less entries that can
//! never match a reel record).

use crate::errors::DecodeError;
use crate::types::{PalletDeclaration, PalletItem, ReelRecord};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Fixed marker token separating the count field from the order field on a
/// reel label
const REEL_MARKER: &str = "FNC103";

/// Length of the raw production-order field following the marker
const ORDER_FIELD_LEN: usize = 11;

/// Length of the raw reel-number field following the order field
const REEL_FIELD_LEN: usize = 6;

/// Plant code prefixed to the order digits extracted from a pallet label
const PLANT_ORDER_PREFIX: &str = "P552-";

// ----------------------------------------------------------------------------
// Classification
// ----------------------------------------------------------------------------

/// A scanned string classified into one of the two supported label formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedLabel {
    Reel(ReelRecord),
    Pallet(PalletDeclaration),
}

/// Classify a raw scanned string.
///
/// Reel decoding is attempted first; anything that fails it is treated as a
/// pallet label. This matches the devices in the field, which provide no
/// format tag of their own.
pub fn classify(raw: &str) -> ScannedLabel {
    match decode_reel(raw) {
        Ok(record) => ScannedLabel::Reel(record),
        Err(_) => ScannedLabel::Pallet(decode_pallet(raw)),
    }
}

// ----------------------------------------------------------------------------
// Reel Labels
// ----------------------------------------------------------------------------

/// Decode a reel label.
///
/// Layout, by offset from the second `-`:
/// - the four characters after the dash are ignored;
/// - everything up to the `FNC103` marker is the variable count;
/// - the 11 characters after the marker are the raw order field, emitted as
///   `P<chars 0..3>-<chars 4..11>`;
/// - the next 6 characters are the raw reel field, emitted as
///   `<chars 0..2 as integer>-<chars 2..6>`.
pub fn decode_reel(raw: &str) -> Result<ReelRecord, DecodeError> {
    let first_dash = raw.find('-');
    let second_dash = match first_dash {
        Some(i) => raw[i + 1..].find('-').map(|j| i + 1 + j),
        None => None,
    };
    let second_dash = second_dash.ok_or(DecodeError::SecondDashMissing)?;

    let marker_index = raw.find(REEL_MARKER).ok_or(DecodeError::MarkerMissing)?;
    let count_start = second_dash + 5;
    let var_count = raw
        .get(count_start..marker_index)
        .unwrap_or("")
        .to_string();

    let order_start = marker_index + REEL_MARKER.len();
    let reel_start = order_start + ORDER_FIELD_LEN;
    let needed = ORDER_FIELD_LEN + REEL_FIELD_LEN;
    let raw_order = raw
        .get(order_start..reel_start)
        .ok_or(DecodeError::Truncated {
            expected: needed,
            found: raw.len().saturating_sub(order_start),
        })?;
    let raw_reel = raw
        .get(reel_start..reel_start + REEL_FIELD_LEN)
        .ok_or(DecodeError::Truncated {
            expected: needed,
            found: raw.len().saturating_sub(order_start),
        })?;

    // Order field: char 3 is a filler digit dropped from the output.
    let (order_head, order_tail) = match (raw_order.get(..3), raw_order.get(4..)) {
        (Some(head), Some(tail)) => (head, tail),
        _ => {
            return Err(DecodeError::Truncated {
                expected: needed,
                found: raw.len().saturating_sub(order_start),
            })
        }
    };
    let production_order = format!("P{order_head}-{order_tail}");

    let (reel_head, reel_tail) = match (raw_reel.get(..2), raw_reel.get(2..)) {
        (Some(head), Some(tail)) => (head, tail),
        _ => {
            return Err(DecodeError::Truncated {
                expected: needed,
                found: raw.len().saturating_sub(order_start),
            })
        }
    };
    let reel_prefix: u32 = reel_head
        .parse()
        .map_err(|_| DecodeError::BadReelPrefix(reel_head.to_string()))?;
    let reel_number = format!("{reel_prefix}-{reel_tail}");

    Ok(ReelRecord {
        production_order,
        reel_number,
        var_count,
    })
}

// ----------------------------------------------------------------------------
// Pallet Labels
// ----------------------------------------------------------------------------

/// Decode a pallet label. Total: always produces a declaration.
///
/// The first content item starts one character before the first `-` and runs
/// to the first `,`. One printer sub-format offsets the item field, so an
/// item failing the `<digits>-<digits> / <digits>` shape is re-anchored one
/// character before the last `-` inside the token. The remaining items are
/// the comma-split tail. Counts have their leading zeros stripped.
pub fn decode_pallet(raw: &str) -> PalletDeclaration {
    let mut contents: Vec<String> = Vec::new();

    match raw.find('-') {
        Some(first_dash) => {
            // One char before the dash; fall back to the dash itself when the
            // preceding char is not a clean boundary.
            let mut start = first_dash.saturating_sub(1);
            if !raw.is_char_boundary(start) {
                start = first_dash;
            }
            let end = raw[first_dash..].find(',').map(|j| first_dash + j);
            let mut first_item = match end {
                Some(e) => &raw[start..e],
                None => &raw[start..],
            };

            if !is_pallet_item(first_item) {
                // Offset sub-format: re-anchor on the last dash of the token.
                if let Some(last_dash) = first_item.rfind('-') {
                    let mut anchor = last_dash.saturating_sub(1);
                    if !first_item.is_char_boundary(anchor) {
                        anchor = last_dash;
                    }
                    first_item = &first_item[anchor..];
                }
            }
            contents.push(first_item.to_string());

            if let Some(e) = end {
                contents.extend(raw[e + 1..].split(',').map(str::to_string));
            }
        }
        None => {
            contents.extend(raw.split(',').map(str::to_string));
        }
    }

    let items = contents
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(normalize_item)
        .collect();

    // Order digits are chars 3..10 of the label, behind the plant prefix.
    let order_digits = raw.get(3..10.min(raw.len())).unwrap_or("");
    let production_order = format!("{PLANT_ORDER_PREFIX}{order_digits}");

    PalletDeclaration {
        production_order,
        items,
    }
}

/// Normalize one content token into a `(reel, count)` pair, stripping leading
/// zeros from the count. Tokens without a ` / ` separator or with a
/// non-numeric count are carried as-is.
fn normalize_item(content: &str) -> PalletItem {
    match content.split_once(" / ") {
        Some((reel, count)) => {
            let var_count = match count.parse::<u64>() {
                Ok(n) => n.to_string(),
                Err(_) => count.to_string(),
            };
            PalletItem {
                reel_number: reel.to_string(),
                var_count,
            }
        }
        None => PalletItem {
            reel_number: content.to_string(),
            var_count: String::new(),
        },
    }
}

/// `<digits>-<digits> / <digits>`, nothing more
fn is_pallet_item(token: &str) -> bool {
    let Some((head, count)) = token.split_once(" / ") else {
        return false;
    };
    let Some((a, b)) = head.split_once('-') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    digits(a) && digits(b) && digits(count)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
