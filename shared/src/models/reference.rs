//! Reference data read by the inventory engine (producers, groups, varieties)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Certification type meaning "no special certification"
pub const GENERAL_CERTIFICATION: &str = "일반";

/// Characters stripped from both ends of a certification type: the
/// Unicode `White_Space` set, which includes the ideographic space U+3000.
/// The SQL side trims exactly this set as well.
pub const CERTIFICATION_TRIM_CHARS: &[char] = &[
    '\u{0009}', '\u{000A}', '\u{000B}', '\u{000C}', '\u{000D}', '\u{0020}', '\u{0085}',
    '\u{00A0}', '\u{1680}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}',
    '\u{2005}', '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{2028}',
    '\u{2029}', '\u{202F}', '\u{205F}', '\u{3000}',
];

pub fn trim_certification(certification_type: &str) -> &str {
    certification_type.trim_matches(CERTIFICATION_TRIM_CHARS)
}

/// Whether a certification type is the general (uncertified) bucket.
/// Blank values count as general.
pub fn is_general_certification(certification_type: &str) -> bool {
    let trimmed = trim_certification(certification_type);
    trimmed.is_empty() || trimmed == GENERAL_CERTIFICATION
}

/// Normalize an optional certification type, folding missing groups into
/// the general bucket
pub fn certification_or_general(certification_type: Option<&str>) -> String {
    match certification_type {
        Some(cert) if !is_general_certification(cert) => trim_certification(cert).to_string(),
        _ => GENERAL_CERTIFICATION.to_string(),
    }
}

/// A producer group (작목반) registered for one production year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProducerGroup {
    pub id: Uuid,
    /// Short code, unique together with `year`
    pub code: String,
    pub name: String,
    pub year: i32,
    /// e.g. "유기농", "무농약", or "일반"
    pub certification_type: String,
    pub certification_number: Option<String>,
}

impl ProducerGroup {
    pub fn is_certified(&self) -> bool {
        !is_general_certification(&self.certification_type)
    }
}

/// A farmer delivering grain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Producer {
    pub id: Uuid,
    pub group_id: Option<Uuid>,
    /// Number of the producer within its group
    pub producer_no: i32,
    pub name: String,
}

/// A grain variety, e.g. "신동진" of type "메벼"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variety {
    pub id: Uuid,
    pub name: String,
    pub variety_type: String,
}

/// A producer resolved together with its (optional) group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProducerProfile {
    pub producer: Producer,
    pub group: Option<ProducerGroup>,
}

impl ProducerProfile {
    pub fn certification_type(&self) -> String {
        certification_or_general(self.group.as_ref().map(|g| g.certification_type.as_str()))
    }

    /// The group, but only when it carries a non-general certification
    pub fn certified_group(&self) -> Option<&ProducerGroup> {
        self.group.as_ref().filter(|g| g.is_certified())
    }
}
