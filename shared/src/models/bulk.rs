//! Partial-failure results for bulk operations and imports

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

/// One item a bulk operation could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub code: String,
    pub reason: String,
}

/// Outcome of a best-effort bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn record_success(&mut self, id: Uuid) {
        self.succeeded.push(id);
    }

    pub fn record_failure(&mut self, id: Uuid, error: &LedgerError) {
        self.failed.push(BulkFailure {
            id,
            code: error.code().to_string(),
            reason: error.to_string(),
        });
    }

    /// e.g. "12 deleted, 3 skipped"
    pub fn summary(&self, verb: &str) -> String {
        format!("{} {}, {} skipped", self.succeeded.len(), verb, self.failed.len())
    }
}

/// One row of a stock import, as read from a spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub production_year: Option<i32>,
    pub producer_name: Option<String>,
    pub variety_name: Option<String>,
    pub bag_no: Option<i32>,
    pub weight_kg: Option<Decimal>,
    pub incoming_date: Option<NaiveDate>,
}

/// A row whose required fields are all present
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteImportRow {
    pub production_year: i32,
    pub producer_name: String,
    pub variety_name: String,
    pub bag_no: i32,
    pub weight_kg: Decimal,
    pub incoming_date: NaiveDate,
}

fn required_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ImportRow {
    /// Check required fields, listing every missing one
    pub fn complete(&self) -> LedgerResult<CompleteImportRow> {
        let producer_name = required_text(&self.producer_name);
        let variety_name = required_text(&self.variety_name);

        let mut missing = Vec::new();
        if self.production_year.is_none() {
            missing.push("production_year");
        }
        if producer_name.is_none() {
            missing.push("producer_name");
        }
        if variety_name.is_none() {
            missing.push("variety_name");
        }
        if self.bag_no.is_none() {
            missing.push("bag_no");
        }
        if self.weight_kg.is_none() {
            missing.push("weight_kg");
        }
        if self.incoming_date.is_none() {
            missing.push("incoming_date");
        }

        match (
            self.production_year,
            producer_name,
            variety_name,
            self.bag_no,
            self.weight_kg,
            self.incoming_date,
        ) {
            (
                Some(production_year),
                Some(producer_name),
                Some(variety_name),
                Some(bag_no),
                Some(weight_kg),
                Some(incoming_date),
            ) => Ok(CompleteImportRow {
                production_year,
                producer_name,
                variety_name,
                bag_no,
                weight_kg,
                incoming_date,
            }),
            _ => Err(LedgerError::validation(
                missing.first().copied().unwrap_or("row"),
                format!("Missing required fields: {}", missing.join(", ")),
            )),
        }
    }
}

/// Problem found on one import row (1-based row number)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    pub row: usize,
    pub reason: String,
}

/// Per-row outcome counts of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub inserted: Vec<Uuid>,
    pub skipped: Vec<RowIssue>,
    pub failed: Vec<RowIssue>,
}

impl ImportReport {
    /// Duplicates are skipped, everything else that goes wrong fails
    pub fn record_error(&mut self, row: usize, error: &LedgerError) {
        let issue = RowIssue {
            row,
            reason: error.to_string(),
        };
        match error {
            LedgerError::DuplicateKey(_) => self.skipped.push(issue),
            _ => self.failed.push(issue),
        }
    }

    pub fn total_rows(&self) -> usize {
        self.inserted.len() + self.skipped.len() + self.failed.len()
    }
}
