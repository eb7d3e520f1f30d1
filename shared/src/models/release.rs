//! Stock release (shipment) models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::StockView;
use crate::error::{LedgerError, LedgerResult};

/// One outbound shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRelease {
    pub id: Uuid,
    pub release_date: NaiveDate,
    pub destination: String,
    pub purpose: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for releasing stock
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewRelease {
    #[validate(length(min = 1, message = "At least one stock is required"))]
    pub stock_ids: Vec<Uuid>,
    pub release_date: NaiveDate,
    pub destination: String,
    pub purpose: Option<String>,
}

/// Descriptive-field edit of a release; membership is not touched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseChanges {
    pub release_date: NaiveDate,
    pub destination: String,
    pub purpose: Option<String>,
}

/// Destination must contain something other than whitespace
pub fn validate_destination(destination: &str) -> LedgerResult<String> {
    let trimmed = destination.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("destination", "Destination is required"));
    }
    Ok(trimmed.to_string())
}

/// Blank purposes are stored as absent
pub fn normalize_purpose(purpose: Option<&str>) -> Option<String> {
    purpose
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// What happened to a release after one of its stocks was taken out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseRemoval {
    Kept { release_id: Uuid, remaining: i64 },
    Deleted { release_id: Uuid },
}

impl ReleaseRemoval {
    /// Single-item removal deletes a release left without members
    pub fn after_removal(release_id: Uuid, remaining: i64) -> Self {
        if remaining <= 0 {
            ReleaseRemoval::Deleted { release_id }
        } else {
            ReleaseRemoval::Kept { release_id, remaining }
        }
    }

    pub fn release_deleted(&self) -> bool {
        matches!(self, ReleaseRemoval::Deleted { .. })
    }
}

/// Release row for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSummary {
    #[serde(flatten)]
    pub release: StockRelease,
    pub item_count: i64,
    pub total_weight_kg: Decimal,
}

/// Release with its member stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDetail {
    #[serde(flatten)]
    pub release: StockRelease,
    pub stocks: Vec<StockView>,
    pub total_weight_kg: Decimal,
}
