//! Milling batch and packaging output models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::Stock;
use crate::error::{LedgerError, LedgerResult};
use crate::validation::{validate_weight_column, TOTAL_WEIGHT_PRECISION, UNIT_WEIGHT_PRECISION};

/// One production run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MillingBatch {
    pub id: Uuid,
    pub milling_date: NaiveDate,
    pub title: String,
    pub remarks: Option<String>,
    /// Category label such as "백미" or "현미"
    pub milling_type: String,
    /// Always the sum of the linked stock weights
    pub total_input_kg: Decimal,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// OPEN --close--> CLOSED --reopen--> OPEN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Open,
    Closed,
}

impl MillingBatch {
    pub fn state(&self) -> BatchState {
        if self.is_closed {
            BatchState::Closed
        } else {
            BatchState::Open
        }
    }

    /// Closed batches reject every mutation except reopen
    pub fn ensure_open(&self) -> LedgerResult<()> {
        match self.state() {
            BatchState::Open => Ok(()),
            BatchState::Closed => Err(LedgerError::Locked(format!(
                "Milling batch '{}' is closed; reopen it first",
                self.title
            ))),
        }
    }

    pub fn ensure_deletable(&self) -> LedgerResult<()> {
        self.ensure_open()
    }

    /// Removing input is blocked once packaging output is recorded
    pub fn ensure_input_removable(&self, output_lines: usize) -> LedgerResult<()> {
        self.ensure_open()?;
        if output_lines > 0 {
            return Err(LedgerError::Conflict(format!(
                "Milling batch '{}' already has packaging recorded; clear packaging before removing input stock",
                self.title
            )));
        }
        Ok(())
    }
}

/// One packaging line of a batch's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPackage {
    pub id: Uuid,
    pub batch_id: Uuid,
    /// Package label, e.g. "20kg"
    pub package_type: String,
    pub unit_weight_kg: Decimal,
    pub package_count: i32,
    pub total_weight_kg: Decimal,
}

/// Packaging line as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingLine {
    pub package_type: String,
    pub unit_weight_kg: Decimal,
    pub package_count: i32,
    /// Optional; when given it must equal count × unit weight
    pub total_weight_kg: Option<Decimal>,
}

impl PackagingLine {
    /// Validate the line and return its total weight
    pub fn validate(&self) -> LedgerResult<Decimal> {
        if self.package_type.trim().is_empty() {
            return Err(LedgerError::validation("package_type", "Package type is required"));
        }
        if self.unit_weight_kg <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "unit_weight_kg",
                "Unit weight must be positive",
            ));
        }
        if self.package_count < 0 {
            return Err(LedgerError::validation(
                "package_count",
                "Package count cannot be negative",
            ));
        }
        validate_weight_column("unit_weight_kg", self.unit_weight_kg, UNIT_WEIGHT_PRECISION)?;
        let expected = self
            .unit_weight_kg
            .checked_mul(Decimal::from(self.package_count))
            .ok_or_else(|| {
                LedgerError::validation("total_weight_kg", "Total packaged weight is out of range")
            })?;
        validate_weight_column("total_weight_kg", expected, TOTAL_WEIGHT_PRECISION)?;
        match self.total_weight_kg {
            Some(total) if total != expected => Err(LedgerError::validation(
                "total_weight_kg",
                format!(
                    "Total weight {} for '{}' does not match {} × {}",
                    total, self.package_type, self.package_count, self.unit_weight_kg
                ),
            )),
            _ => Ok(expected),
        }
    }
}

/// Validate a whole replacement set, returning `(line, total)` pairs
pub fn validate_packaging(lines: &[PackagingLine]) -> LedgerResult<Vec<(&PackagingLine, Decimal)>> {
    lines
        .iter()
        .map(|line| line.validate().map(|total| (line, total)))
        .collect()
}

/// Input for sending stock to milling
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewMillingBatch {
    pub milling_date: NaiveDate,
    pub title: String,
    pub remarks: Option<String>,
    pub milling_type: String,
    #[validate(length(min = 1, message = "At least one stock is required"))]
    pub stock_ids: Vec<Uuid>,
}

fn required_label(field: &str, value: &str, message: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation(field, message));
    }
    Ok(trimmed.to_string())
}

/// Labels of a new batch as they are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLabels {
    pub title: String,
    pub milling_type: String,
    pub remarks: Option<String>,
}

impl NewMillingBatch {
    /// Trim the text fields, rejecting a blank title or milling type
    pub fn labels(&self) -> LedgerResult<BatchLabels> {
        Ok(BatchLabels {
            title: required_label("title", &self.title, "Title is required")?,
            milling_type: required_label("milling_type", &self.milling_type, "Milling type is required")?,
            remarks: self
                .remarks
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

/// Direction of a single-stock membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockMovement {
    Add,
    Remove,
}

/// Check that `stock` may leave `batch`
pub fn ensure_member_of(batch: &MillingBatch, stock: &Stock) -> LedgerResult<()> {
    if stock.milling_batch_id != Some(batch.id) {
        return Err(LedgerError::InvalidState(format!(
            "Stock {} is not part of milling batch '{}'",
            stock.label(),
            batch.title
        )));
    }
    Ok(())
}

/// Sum of packaged output weight
pub fn total_output_weight(outputs: &[OutputPackage]) -> Decimal {
    outputs.iter().map(|o| o.total_weight_kg).sum()
}

/// Output/input ratio in percent, rounded to two decimals. `None` when
/// there is no input or the ratio is not representable.
pub fn yield_percent(total_output_kg: Decimal, total_input_kg: Decimal) -> Option<Decimal> {
    if total_input_kg <= Decimal::ZERO {
        return None;
    }
    total_output_kg
        .checked_div(total_input_kg)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|ratio| ratio.round_dp(2))
}

/// Yield of a batch; only defined once the batch is closed with packaged output
pub fn milling_yield(batch: &MillingBatch, outputs: &[OutputPackage]) -> Option<Decimal> {
    batch_yield(batch, outputs.len(), total_output_weight(outputs))
}

/// Same as [`milling_yield`] for callers that only hold aggregated output
pub fn batch_yield(batch: &MillingBatch, output_lines: usize, total_output_kg: Decimal) -> Option<Decimal> {
    if !batch.is_closed || output_lines == 0 {
        return None;
    }
    yield_percent(total_output_kg, batch.total_input_kg)
}

/// Batch with its input, output and derived yield
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MillingBatchDetail {
    #[serde(flatten)]
    pub batch: MillingBatch,
    pub stocks: Vec<super::StockView>,
    pub outputs: Vec<OutputPackage>,
    pub total_output_kg: Decimal,
    pub yield_percent: Option<Decimal>,
}

/// Batch row for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MillingBatchSummary {
    #[serde(flatten)]
    pub batch: MillingBatch,
    pub stock_count: i64,
    pub total_output_kg: Decimal,
    pub yield_percent: Option<Decimal>,
}
