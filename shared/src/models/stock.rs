//! Stock (raw grain bag) model and lifecycle rules

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::validation::{validate_weight_column, STOCK_WEIGHT_PRECISION};

/// Lifecycle status of a stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,
    Consumed,
    Released,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "AVAILABLE",
            StockStatus::Consumed => "CONSUMED",
            StockStatus::Released => "RELEASED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(StockStatus::Available),
            "CONSUMED" => Some(StockStatus::Consumed),
            "RELEASED" => Some(StockStatus::Released),
            _ => None,
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::Available => write!(f, "available"),
            StockStatus::Consumed => write!(f, "consumed by milling"),
            StockStatus::Released => write!(f, "released"),
        }
    }
}

/// Composite key that identifies a bag: at most one stock per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub production_year: i32,
    pub producer_id: Uuid,
    pub variety_id: Uuid,
    pub bag_no: i32,
}

/// One physical bag or tonbag of raw grain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: Uuid,
    pub production_year: i32,
    pub producer_id: Uuid,
    pub variety_id: Uuid,
    pub bag_no: i32,
    pub weight_kg: Decimal,
    pub incoming_date: NaiveDate,
    pub status: StockStatus,
    pub lot_code: Option<String>,
    pub milling_batch_id: Option<Uuid>,
    pub release_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    pub fn key(&self) -> StockKey {
        StockKey {
            production_year: self.production_year,
            producer_id: self.producer_id,
            variety_id: self.variety_id,
            bag_no: self.bag_no,
        }
    }

    /// Short human label used in error messages, e.g. "2024 bag #10"
    pub fn label(&self) -> String {
        format!("{} bag #{}", self.production_year, self.bag_no)
    }

    /// Check that the status agrees with the batch/release references
    pub fn check_links(&self) -> LedgerResult<()> {
        let consistent = match self.status {
            StockStatus::Available => self.milling_batch_id.is_none() && self.release_id.is_none(),
            StockStatus::Consumed => self.milling_batch_id.is_some() && self.release_id.is_none(),
            StockStatus::Released => self.release_id.is_some() && self.milling_batch_id.is_none(),
        };
        if consistent {
            Ok(())
        } else {
            Err(LedgerError::InvalidState(format!(
                "Stock {} is {} but its batch/release references disagree",
                self.label(),
                self.status
            )))
        }
    }

    pub fn ensure_available(&self) -> LedgerResult<()> {
        if self.status == StockStatus::Available {
            Ok(())
        } else {
            Err(LedgerError::InvalidState(format!(
                "Stock {} is not available (currently {})",
                self.label(),
                self.status
            )))
        }
    }

    /// Consumed stock belongs to a milling run and cannot be deleted
    pub fn ensure_deletable(&self) -> LedgerResult<()> {
        match self.status {
            StockStatus::Consumed => Err(LedgerError::Conflict(format!(
                "Stock {} is already used in a milling run",
                self.label()
            ))),
            StockStatus::Available | StockStatus::Released => Ok(()),
        }
    }

    /// AVAILABLE -> CONSUMED, linked to `batch_id`
    pub fn consume(&mut self, batch_id: Uuid) -> LedgerResult<()> {
        self.ensure_available()?;
        self.status = StockStatus::Consumed;
        self.milling_batch_id = Some(batch_id);
        self.release_id = None;
        Ok(())
    }

    /// AVAILABLE -> RELEASED, linked to `release_id`
    pub fn release_to(&mut self, release_id: Uuid) -> LedgerResult<()> {
        self.ensure_available()?;
        self.status = StockStatus::Released;
        self.release_id = Some(release_id);
        self.milling_batch_id = None;
        Ok(())
    }

    /// Back to AVAILABLE with both references cleared
    pub fn return_to_available(&mut self) {
        self.status = StockStatus::Available;
        self.milling_batch_id = None;
        self.release_id = None;
    }
}

/// Input for registering a new stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStock {
    pub production_year: i32,
    pub producer_id: Uuid,
    pub variety_id: Uuid,
    pub bag_no: i32,
    pub weight_kg: Decimal,
    pub incoming_date: NaiveDate,
}

impl NewStock {
    pub fn key(&self) -> StockKey {
        StockKey {
            production_year: self.production_year,
            producer_id: self.producer_id,
            variety_id: self.variety_id,
            bag_no: self.bag_no,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_weight(self.weight_kg)?;
        validate_bag_no(self.bag_no)?;
        validate_production_year(self.production_year)
    }
}

/// Partial edit of a stock; `None` keeps the current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockChanges {
    pub production_year: Option<i32>,
    pub producer_id: Option<Uuid>,
    pub variety_id: Option<Uuid>,
    pub bag_no: Option<i32>,
    pub weight_kg: Option<Decimal>,
    pub incoming_date: Option<NaiveDate>,
}

/// Result of applying [`StockChanges`] to a stock
#[derive(Debug, Clone, PartialEq)]
pub struct StockEdit {
    pub updated: Stock,
    /// New weight minus old weight
    pub weight_delta: Decimal,
    /// Incoming date, producer or variety changed
    pub lot_code_stale: bool,
    pub key_changed: bool,
}

impl StockChanges {
    /// Apply the edit to a copy of `current`. Status and references are
    /// never touched here.
    pub fn apply(&self, current: &Stock) -> LedgerResult<StockEdit> {
        let mut updated = current.clone();
        if let Some(year) = self.production_year {
            validate_production_year(year)?;
            updated.production_year = year;
        }
        if let Some(producer_id) = self.producer_id {
            updated.producer_id = producer_id;
        }
        if let Some(variety_id) = self.variety_id {
            updated.variety_id = variety_id;
        }
        if let Some(bag_no) = self.bag_no {
            validate_bag_no(bag_no)?;
            updated.bag_no = bag_no;
        }
        if let Some(weight) = self.weight_kg {
            validate_weight(weight)?;
            updated.weight_kg = weight;
        }
        if let Some(date) = self.incoming_date {
            updated.incoming_date = date;
        }

        let lot_code_stale = updated.incoming_date != current.incoming_date
            || updated.producer_id != current.producer_id
            || updated.variety_id != current.variety_id;

        Ok(StockEdit {
            weight_delta: updated.weight_kg - current.weight_kg,
            key_changed: updated.key() != current.key(),
            lot_code_stale,
            updated,
        })
    }
}

/// Stock joined with the names needed for lists, exports and drill-downs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockView {
    #[serde(flatten)]
    pub stock: Stock,
    pub producer_name: String,
    pub variety_name: String,
    pub certification_type: String,
    pub group_code: Option<String>,
}

/// Sort order for stock lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSort {
    #[default]
    CreatedDesc,
    CreatedAsc,
    WeightDesc,
    WeightAsc,
}

/// Recognized stock filters shared by the list, export and grouping queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockFilter {
    pub year: Option<i32>,
    pub variety_id: Option<Uuid>,
    pub producer_id: Option<Uuid>,
    /// Case-insensitive substring of the producer name
    pub producer_name: Option<String>,
    pub status: Option<StockStatus>,
    /// Certification type; "일반" also matches producers without a group
    pub cert_type: Option<String>,
    pub sort: StockSort,
}

impl StockFilter {
    /// Producer-name needle, ignoring blank input
    pub fn producer_name_needle(&self) -> Option<&str> {
        self.producer_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Certification filter, ignoring blank input
    pub fn cert_type_filter(&self) -> Option<&str> {
        self.cert_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// In-memory equivalent of the SQL filter
    pub fn matches(&self, row: &StockView) -> bool {
        if self.year.is_some_and(|y| y != row.stock.production_year) {
            return false;
        }
        if self.variety_id.is_some_and(|v| v != row.stock.variety_id) {
            return false;
        }
        if self.producer_id.is_some_and(|p| p != row.stock.producer_id) {
            return false;
        }
        if self.status.is_some_and(|s| s != row.stock.status) {
            return false;
        }
        if let Some(needle) = self.producer_name_needle() {
            if !row
                .producer_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(cert) = self.cert_type_filter() {
            if super::certification_or_general(Some(cert)) != row.certification_type {
                return false;
            }
        }
        true
    }
}

pub fn validate_weight(weight_kg: Decimal) -> LedgerResult<()> {
    if weight_kg < Decimal::ZERO {
        return Err(LedgerError::validation("weight_kg", "Weight cannot be negative"));
    }
    validate_weight_column("weight_kg", weight_kg, STOCK_WEIGHT_PRECISION)
}

pub fn validate_bag_no(bag_no: i32) -> LedgerResult<()> {
    if bag_no < 1 {
        return Err(LedgerError::validation("bag_no", "Bag number must be positive"));
    }
    Ok(())
}

pub fn validate_production_year(year: i32) -> LedgerResult<()> {
    if !(2000..=2100).contains(&year) {
        return Err(LedgerError::validation(
            "production_year",
            format!("Production year {} is out of range", year),
        ));
    }
    Ok(())
}

/// Sum of stock weights
pub fn total_weight<'a>(stocks: impl IntoIterator<Item = &'a Stock>) -> Decimal {
    stocks.into_iter().map(|s| s.weight_kg).sum()
}

fn resolve_requested<'a>(requested: &[Uuid], loaded: &'a [Stock]) -> LedgerResult<Vec<&'a Stock>> {
    if requested.is_empty() {
        return Err(LedgerError::validation("stock_ids", "At least one stock is required"));
    }
    let by_id: HashMap<Uuid, &Stock> = loaded.iter().map(|s| (s.id, s)).collect();
    let mut seen = std::collections::HashSet::new();
    let mut resolved = Vec::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            continue;
        }
        let stock = by_id
            .get(id)
            .ok_or_else(|| LedgerError::InvalidState(format!("Stock {} does not exist", id)))?;
        resolved.push(*stock);
    }
    Ok(resolved)
}

/// Verify every requested stock was loaded and is AVAILABLE, naming the
/// first offender in request order. Returns the total weight of the set.
pub fn ensure_all_available(requested: &[Uuid], loaded: &[Stock]) -> LedgerResult<Decimal> {
    let resolved = resolve_requested(requested, loaded)?;
    for stock in &resolved {
        stock.ensure_available()?;
    }
    Ok(total_weight(resolved))
}

/// Verify every requested stock was loaded and is RELEASED
pub fn ensure_all_released(requested: &[Uuid], loaded: &[Stock]) -> LedgerResult<()> {
    for stock in resolve_requested(requested, loaded)? {
        if stock.status != StockStatus::Released {
            return Err(LedgerError::InvalidState(format!(
                "Stock {} is not released (currently {})",
                stock.label(),
                stock.status
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(status: StockStatus) -> Stock {
        Stock {
            id: Uuid::new_v4(),
            production_year: 2024,
            producer_id: Uuid::new_v4(),
            variety_id: Uuid::new_v4(),
            bag_no: 1,
            weight_kg: Decimal::from(500),
            incoming_date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            status,
            lot_code: None,
            milling_batch_id: None,
            release_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [StockStatus::Available, StockStatus::Consumed, StockStatus::Released] {
            assert_eq!(StockStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StockStatus::parse("available"), None);
    }

    #[test]
    fn view_serializes_flat_with_wire_status() {
        let view = StockView {
            stock: stock(StockStatus::Released),
            producer_name: "김철수".to_string(),
            variety_name: "신동진".to_string(),
            certification_type: "일반".to_string(),
            group_code: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "RELEASED");
        assert_eq!(json["bag_no"], 1);
        assert_eq!(json["producer_name"], "김철수");
    }

    #[test]
    fn filter_accepts_partial_json() {
        let filter: StockFilter =
            serde_json::from_str(r#"{"year": 2024, "status": "AVAILABLE", "sort": "weight_desc"}"#)
                .unwrap();
        assert_eq!(filter.year, Some(2024));
        assert_eq!(filter.status, Some(StockStatus::Available));
        assert_eq!(filter.sort, StockSort::WeightDesc);
        assert!(filter.producer_name.is_none());
    }

    #[test]
    fn duplicate_ids_are_counted_once() {
        let s = stock(StockStatus::Available);
        let total = ensure_all_available(&[s.id, s.id], &[s.clone()]).unwrap();
        assert_eq!(total, Decimal::from(500));
    }
}
