//! Bulk stock import (JSON rows or CSV) and CSV export

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use shared::{
    validate_bulk_size, CompleteImportRow, ImportReport, ImportRow, LedgerError, LedgerResult,
    NewStock, ProducerProfile, StockView,
};

use crate::config::InventoryConfig;
use crate::error::{AppError, AppResult};
use crate::services::reference;
use crate::services::stock::StockService;

const EXPORT_HEADERS: [&str; 11] = [
    "lot_code",
    "production_year",
    "producer_name",
    "group_code",
    "certification_type",
    "variety_name",
    "bag_no",
    "weight_kg",
    "incoming_date",
    "status",
    "id",
];

/// Choose the producer an import row refers to. Producer names repeat
/// across years, so a producer whose group belongs to the production year
/// wins; otherwise a single candidate is accepted as is.
pub(crate) fn pick_producer(
    name: &str,
    production_year: i32,
    candidates: Vec<ProducerProfile>,
) -> LedgerResult<ProducerProfile> {
    let (same_year, other): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|c| c.group.as_ref().map(|g| g.year) == Some(production_year));

    let pool = if same_year.is_empty() { other } else { same_year };
    let mut pool = pool.into_iter();
    match (pool.next(), pool.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(LedgerError::NotFound(format!("Producer '{}'", name))),
        (Some(_), Some(_)) => Err(LedgerError::validation(
            "producer_name",
            format!(
                "Producer name '{}' matches several producers for {}",
                name, production_year
            ),
        )),
    }
}

/// Raw CSV record; every cell is parsed separately so one bad cell fails
/// only its own row
#[derive(Debug, Default, Deserialize)]
struct CsvRecord {
    production_year: Option<String>,
    producer_name: Option<String>,
    variety_name: Option<String>,
    bag_no: Option<String>,
    weight_kg: Option<String>,
    incoming_date: Option<String>,
}

fn parse_cell<T: FromStr>(field: &str, value: Option<String>) -> LedgerResult<Option<T>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| LedgerError::validation(field, format!("'{}' is not a valid {}", raw, field))),
    }
}

impl CsvRecord {
    fn into_row(self) -> LedgerResult<ImportRow> {
        Ok(ImportRow {
            production_year: parse_cell("production_year", self.production_year)?,
            producer_name: self.producer_name,
            variety_name: self.variety_name,
            bag_no: parse_cell("bag_no", self.bag_no)?,
            weight_kg: parse_cell::<Decimal>("weight_kg", self.weight_kg)?,
            incoming_date: parse_cell::<NaiveDate>("incoming_date", self.incoming_date)?,
        })
    }
}

/// Parse a CSV body into import rows; unreadable records become row errors
pub(crate) fn parse_csv(body: &str) -> Vec<LedgerResult<ImportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    reader
        .deserialize::<CsvRecord>()
        .map(|record| {
            record
                .map_err(|e| LedgerError::validation("row", format!("Unreadable CSV record: {}", e)))
                .and_then(CsvRecord::into_row)
        })
        .collect()
}

/// Render stock rows as CSV
pub(crate) fn export_csv(rows: &[StockView]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |e: csv::Error| AppError::Internal(format!("CSV export failed: {}", e));

    writer.write_record(EXPORT_HEADERS).map_err(csv_error)?;
    for row in rows {
        let stock = &row.stock;
        writer
            .write_record([
                stock.lot_code.clone().unwrap_or_default(),
                stock.production_year.to_string(),
                row.producer_name.clone(),
                row.group_code.clone().unwrap_or_default(),
                row.certification_type.clone(),
                row.variety_name.clone(),
                stock.bag_no.to_string(),
                stock.weight_kg.to_string(),
                stock.incoming_date.to_string(),
                stock.status.as_str().to_string(),
                stock.id.to_string(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

/// Import service
#[derive(Clone)]
pub struct ImportService {
    db: PgPool,
    limits: InventoryConfig,
}

impl ImportService {
    /// Create a new ImportService instance
    pub fn new(db: PgPool, limits: InventoryConfig) -> Self {
        Self { db, limits }
    }

    /// Import JSON rows
    pub async fn import(&self, rows: Vec<ImportRow>) -> AppResult<ImportReport> {
        self.import_parsed(rows.into_iter().map(Ok).collect()).await
    }

    /// Import a CSV body whose header names the import columns
    pub async fn import_csv(&self, body: &str) -> AppResult<ImportReport> {
        self.import_parsed(parse_csv(body)).await
    }

    /// Each row is inserted in its own transaction; duplicates are
    /// skipped and any other problem fails only that row
    async fn import_parsed(&self, rows: Vec<LedgerResult<ImportRow>>) -> AppResult<ImportReport> {
        validate_bulk_size("rows", rows.len(), self.limits.bulk_max_items)?;

        let mut report = ImportReport::default();
        for (index, parsed) in rows.into_iter().enumerate() {
            let row_no = index + 1;
            let result = match parsed.and_then(|row| row.complete()) {
                Ok(row) => self.import_row(&row).await,
                Err(err) => Err(err.into()),
            };
            match result {
                Ok(stock_id) => report.inserted.push(stock_id),
                Err(err) => {
                    let err = err.into_ledger_error();
                    tracing::warn!(row = row_no, reason = %err, "import row not inserted");
                    report.record_error(row_no, &err);
                }
            }
        }

        tracing::info!(
            inserted = report.inserted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "stock import finished"
        );
        Ok(report)
    }

    async fn import_row(&self, row: &CompleteImportRow) -> AppResult<uuid::Uuid> {
        let mut tx = self.db.begin().await?;

        let candidates = reference::producers_named(&mut tx, &row.producer_name).await?;
        let producer = pick_producer(&row.producer_name, row.production_year, candidates)?;
        let variety = reference::variety_named(&mut tx, &row.variety_name)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Variety '{}'", row.variety_name)))?;

        let input = NewStock {
            production_year: row.production_year,
            producer_id: producer.producer.id,
            variety_id: variety.id,
            bag_no: row.bag_no,
            weight_kg: row.weight_kg,
            incoming_date: row.incoming_date,
        };
        let stock = StockService::insert_stock(&mut tx, &input).await?;
        tx.commit().await?;

        Ok(stock.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Producer, ProducerGroup};
    use uuid::Uuid;

    fn profile(name: &str, group_year: Option<i32>) -> ProducerProfile {
        let group = group_year.map(|year| ProducerGroup {
            id: Uuid::new_v4(),
            code: "GA".to_string(),
            name: "가작목반".to_string(),
            year,
            certification_type: "유기농".to_string(),
            certification_number: Some("12-345".to_string()),
        });
        ProducerProfile {
            producer: Producer {
                id: Uuid::new_v4(),
                group_id: group.as_ref().map(|g| g.id),
                producer_no: 7,
                name: name.to_string(),
            },
            group,
        }
    }

    #[test]
    fn same_year_group_wins() {
        let old = profile("김철수", Some(2023));
        let current = profile("김철수", Some(2024));
        let picked = pick_producer("김철수", 2024, vec![old, current.clone()]).unwrap();
        assert_eq!(picked, current);
    }

    #[test]
    fn single_candidate_is_accepted() {
        let only = profile("이영희", None);
        let picked = pick_producer("이영희", 2024, vec![only.clone()]).unwrap();
        assert_eq!(picked, only);
    }

    #[test]
    fn unknown_and_ambiguous_names_fail() {
        assert!(matches!(
            pick_producer("박", 2024, vec![]),
            Err(LedgerError::NotFound(_))
        ));
        let result = pick_producer("박", 2024, vec![profile("박", None), profile("박", Some(2022))]);
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn csv_rows_parse_per_record() {
        let body = "production_year,producer_name,variety_name,bag_no,weight_kg,incoming_date\n\
                    2024,김철수,신동진,1,500.5,2024-10-01\n\
                    2024,김철수,신동진,x,500,2024-10-01\n\
                    2024,,신동진,3,,2024-10-01\n";
        let rows = parse_csv(body);
        assert_eq!(rows.len(), 3);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.weight_kg, Some(Decimal::new(5005, 1)));
        assert_eq!(first.incoming_date, NaiveDate::from_ymd_opt(2024, 10, 1));

        assert!(matches!(&rows[1], Err(LedgerError::Validation { field, .. }) if field == "bag_no"));

        let third = rows[2].as_ref().unwrap();
        assert!(third.producer_name.is_none());
        assert!(third.complete().is_err());
    }

    #[test]
    fn export_writes_header_and_rows() {
        let csv = export_csv(&[]).unwrap();
        assert_eq!(csv.lines().next().unwrap(), EXPORT_HEADERS.join(","));
        assert_eq!(csv.lines().count(), 1);
    }
}
