//! Lot code derivation for stock traceability
//!
//! A lot code has four hyphen-separated segments:
//!
//! ```text
//! 240915-12-1234567-JB010007
//! ^^^^^^ ^^ ^^^^^^^ ^^^^^^^^
//! date   |  cert    group code + producer number (4 digits)
//!        category
//! ```
//!
//! The producer number is zero-padded to [`PRODUCER_NO_WIDTH`] digits, so the
//! boundary between group code and producer number in the last segment is
//! always the final four characters.

use chrono::NaiveDate;

use super::{ProducerProfile, Variety};
use crate::error::{LedgerError, LedgerResult};

/// Separator between lot code segments
pub const LOT_CODE_SEPARATOR: char = '-';

/// Fixed width of the producer number inside the traceability segment
pub const PRODUCER_NO_WIDTH: usize = 4;

/// Category used when nothing in the lookup tables matches
pub const DEFAULT_CATEGORY: &str = "00";

/// Milling label used for raw stock that has not been milled yet (paddy)
pub const RAW_GRAIN_MILLING_TYPE: &str = "벼";

/// Variety-name substrings with a fixed category, most specific first
const VARIETY_NAME_CATEGORIES: &[(&str, &str)] = &[
    ("찰흑미", "42"),
    ("흑미", "41"),
    ("녹미", "43"),
    ("홍미", "44"),
    ("적미", "44"),
    ("향미", "45"),
    ("찰보리", "52"),
    ("보리", "51"),
    ("귀리", "53"),
    ("수수", "54"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrainFamily {
    Rice,
    GlutinousRice,
    Specialty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MillingFamily {
    Husked,
    Milled,
}

fn grain_family(variety_type: &str) -> Option<GrainFamily> {
    if variety_type.contains("잡곡") || variety_type.contains("특수") {
        Some(GrainFamily::Specialty)
    } else if variety_type.contains('찰') {
        Some(GrainFamily::GlutinousRice)
    } else if variety_type.contains('메') || variety_type.contains('벼') || variety_type.contains('쌀') {
        Some(GrainFamily::Rice)
    } else {
        None
    }
}

fn milling_family(milling_type: &str) -> Option<MillingFamily> {
    if milling_type.contains("백미") || milling_type.contains("분도") {
        Some(MillingFamily::Milled)
    } else if milling_type.contains("현미") || milling_type.contains('벼') {
        Some(MillingFamily::Husked)
    } else {
        None
    }
}

/// Two-digit product category for a variety and milling type
pub fn category_code(variety_type: &str, variety_name: &str, milling_type: &str) -> &'static str {
    if let Some((_, code)) = VARIETY_NAME_CATEGORIES
        .iter()
        .find(|(needle, _)| variety_name.contains(needle))
    {
        return code;
    }

    match (grain_family(variety_type), milling_family(milling_type)) {
        (Some(GrainFamily::Rice), Some(MillingFamily::Milled)) => "11",
        (Some(GrainFamily::Rice), Some(MillingFamily::Husked)) => "12",
        (Some(GrainFamily::GlutinousRice), Some(MillingFamily::Milled)) => "13",
        (Some(GrainFamily::GlutinousRice), Some(MillingFamily::Husked)) => "14",
        (Some(GrainFamily::Specialty), Some(MillingFamily::Milled)) => "31",
        (Some(GrainFamily::Specialty), Some(MillingFamily::Husked)) => "32",
        _ => DEFAULT_CATEGORY,
    }
}

fn certification_segment(certification_number: &str) -> String {
    let cleaned: String = certification_number
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        "0".to_string()
    } else {
        cleaned
    }
}

/// Largest producer number that fits the fixed-width traceability segment
pub const MAX_PRODUCER_NO: i32 = 9999;

/// Build the traceability segment: group code followed by the zero-padded
/// producer number, without a separator. Numbers outside
/// `0..=MAX_PRODUCER_NO` would shift the boundary and are rejected.
pub fn traceability_segment(producer_group_code: &str, producer_number: i32) -> LedgerResult<String> {
    if !(0..=MAX_PRODUCER_NO).contains(&producer_number) {
        return Err(LedgerError::validation(
            "producer_no",
            format!(
                "Producer number {} does not fit the lot code (0 to {})",
                producer_number, MAX_PRODUCER_NO
            ),
        ));
    }
    let group: String = producer_group_code
        .chars()
        .filter(|c| *c != LOT_CODE_SEPARATOR && !c.is_whitespace())
        .collect();
    Ok(format!(
        "{}{:0width$}",
        group,
        producer_number,
        width = PRODUCER_NO_WIDTH
    ))
}

/// Split a traceability segment back into group code and producer number
pub fn split_traceability_segment(segment: &str) -> Option<(&str, i32)> {
    if segment.len() < PRODUCER_NO_WIDTH || !segment.is_char_boundary(segment.len() - PRODUCER_NO_WIDTH) {
        return None;
    }
    let (group, number) = segment.split_at(segment.len() - PRODUCER_NO_WIDTH);
    if !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    number.parse().ok().map(|n| (group, n))
}

/// Generate a lot code from harvest, variety, milling and producer attributes
pub fn generate_lot_code(
    harvest_date: NaiveDate,
    variety_type: &str,
    variety_name: &str,
    milling_type_label: &str,
    certification_number: &str,
    producer_group_code: &str,
    producer_number: i32,
) -> LedgerResult<String> {
    let sep = LOT_CODE_SEPARATOR;
    Ok(format!(
        "{}{sep}{}{sep}{}{sep}{}",
        harvest_date.format("%y%m%d"),
        category_code(variety_type, variety_name, milling_type_label),
        certification_segment(certification_number),
        traceability_segment(producer_group_code, producer_number)?,
    ))
}

/// Lot code for a raw stock, or `None` when the producer has no group or its
/// group carries the general certification
pub fn lot_code_for_stock(
    incoming_date: NaiveDate,
    variety: &Variety,
    producer: &ProducerProfile,
) -> LedgerResult<Option<String>> {
    let Some(group) = producer.certified_group() else {
        return Ok(None);
    };
    generate_lot_code(
        incoming_date,
        &variety.variety_type,
        &variety.name,
        RAW_GRAIN_MILLING_TYPE,
        group.certification_number.as_deref().unwrap_or_default(),
        &group.code,
        producer.producer.producer_no,
    )
    .map(Some)
}
