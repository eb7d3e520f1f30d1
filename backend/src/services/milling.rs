//! Milling batch engine: sending stock to milling, packaging output,
//! closing, reopening and deleting batches

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{
    batch_yield, ensure_all_available, ensure_member_of, milling_yield, total_output_weight,
    validate_packaging, MillingBatch, MillingBatchDetail, MillingBatchSummary, NewMillingBatch,
    OutputPackage, PackagingLine, StockMovement,
};

use crate::error::{AppError, AppResult};
use crate::services::stock::{
    current_links, ensure_links_unchanged, lock_stock, lock_stocks, views_where, write_links,
};

const BATCH_COLUMNS: &str = "id, milling_date, title, remarks, milling_type, total_input_kg, \
     is_closed, created_at, updated_at";

/// Database row for a milling batch
#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    milling_date: NaiveDate,
    title: String,
    remarks: Option<String>,
    milling_type: String,
    total_input_kg: Decimal,
    is_closed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BatchRow> for MillingBatch {
    fn from(row: BatchRow) -> Self {
        MillingBatch {
            id: row.id,
            milling_date: row.milling_date,
            title: row.title,
            remarks: row.remarks,
            milling_type: row.milling_type,
            total_input_kg: row.total_input_kg,
            is_closed: row.is_closed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a packaging line
#[derive(Debug, FromRow)]
struct OutputRow {
    id: Uuid,
    batch_id: Uuid,
    package_type: String,
    unit_weight_kg: Decimal,
    package_count: i32,
    total_weight_kg: Decimal,
}

impl From<OutputRow> for OutputPackage {
    fn from(row: OutputRow) -> Self {
        OutputPackage {
            id: row.id,
            batch_id: row.batch_id,
            package_type: row.package_type,
            unit_weight_kg: row.unit_weight_kg,
            package_count: row.package_count,
            total_weight_kg: row.total_weight_kg,
        }
    }
}

/// Database row for the batch list
#[derive(Debug, FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    batch: BatchRow,
    stock_count: i64,
    output_lines: i64,
    total_output_kg: Decimal,
}

/// Lock a batch row for the rest of the transaction
pub(crate) async fn lock_batch(conn: &mut PgConnection, id: Uuid) -> AppResult<MillingBatch> {
    sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {} FROM milling_batches WHERE id = $1 FOR UPDATE",
        BATCH_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(MillingBatch::from)
    .ok_or_else(|| AppError::NotFound("Milling batch".to_string()))
}

/// Set the batch total to the sum of its linked stock
async fn recompute_total(conn: &mut PgConnection, id: Uuid) -> AppResult<Decimal> {
    let total = sqlx::query_scalar::<_, Decimal>(
        r#"
        UPDATE milling_batches
        SET total_input_kg = (
            SELECT COALESCE(SUM(weight_kg), 0) FROM stocks WHERE milling_batch_id = $1
        )
        WHERE id = $1
        RETURNING total_input_kg
        "#,
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(total)
}

async fn output_count(conn: &mut PgConnection, id: Uuid) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM milling_outputs WHERE batch_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

async fn outputs_of(conn: &mut PgConnection, id: Uuid) -> AppResult<Vec<OutputPackage>> {
    let rows = sqlx::query_as::<_, OutputRow>(
        r#"
        SELECT id, batch_id, package_type, unit_weight_kg, package_count, total_weight_kg
        FROM milling_outputs
        WHERE batch_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(OutputPackage::from).collect())
}

async fn set_closed(conn: &mut PgConnection, id: Uuid, closed: bool) -> AppResult<()> {
    sqlx::query("UPDATE milling_batches SET is_closed = $1 WHERE id = $2")
        .bind(closed)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Result of deleting a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchDeletion {
    pub id: Uuid,
    /// Input stock returned to AVAILABLE
    pub released_stock_ids: Vec<Uuid>,
    pub deleted_outputs: u64,
}

/// Milling batch service
#[derive(Clone)]
pub struct MillingService {
    db: PgPool,
}

impl MillingService {
    /// Create a new MillingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Consume the selected stock into a new open batch.
    /// The batch total is computed here from the locked rows.
    pub async fn start_batch(&self, input: NewMillingBatch) -> AppResult<MillingBatchDetail> {
        input.validate()?;
        let labels = input.labels()?;

        let mut tx = self.db.begin().await?;

        let mut stocks = lock_stocks(&mut tx, &input.stock_ids).await?;
        let total_input_kg = ensure_all_available(&input.stock_ids, &stocks)?;

        let batch: MillingBatch = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            INSERT INTO milling_batches (milling_date, title, remarks, milling_type, total_input_kg)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(input.milling_date)
        .bind(&labels.title)
        .bind(&labels.remarks)
        .bind(&labels.milling_type)
        .bind(total_input_kg)
        .fetch_one(&mut *tx)
        .await?
        .into();

        for stock in stocks.iter_mut() {
            stock.consume(batch.id)?;
            write_links(&mut tx, stock).await?;
        }

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch.id,
            stock_count = stocks.len(),
            total_input_kg = %total_input_kg,
            "milling batch started"
        );
        self.get(batch.id).await
    }

    /// Add one stock to an open batch, or take one out of it.
    /// The total input weight is recomputed from the remaining members.
    pub async fn move_stock(
        &self,
        batch_id: Uuid,
        stock_id: Uuid,
        direction: StockMovement,
    ) -> AppResult<MillingBatchDetail> {
        let mut tx = self.db.begin().await?;

        let links = current_links(&mut tx, stock_id).await?;
        let batch = lock_batch(&mut tx, batch_id).await?;
        let mut stock = lock_stock(&mut tx, stock_id).await?;
        ensure_links_unchanged(&stock, links)?;

        match direction {
            StockMovement::Add => {
                batch.ensure_open()?;
                stock.consume(batch.id)?;
            }
            StockMovement::Remove => {
                let lines = output_count(&mut tx, batch_id).await?;
                batch.ensure_input_removable(lines as usize)?;
                ensure_member_of(&batch, &stock)?;
                stock.return_to_available();
            }
        }
        write_links(&mut tx, &stock).await?;
        let total_input_kg = recompute_total(&mut tx, batch_id).await?;

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch_id,
            stock_id = %stock_id,
            direction = ?direction,
            total_input_kg = %total_input_kg,
            "milling input changed"
        );
        self.get(batch_id).await
    }

    /// Replace the full packaging set of an open batch
    pub async fn set_packaging(
        &self,
        batch_id: Uuid,
        lines: Vec<PackagingLine>,
    ) -> AppResult<MillingBatchDetail> {
        let validated = validate_packaging(&lines)?;

        let mut tx = self.db.begin().await?;

        lock_batch(&mut tx, batch_id).await?.ensure_open()?;

        sqlx::query("DELETE FROM milling_outputs WHERE batch_id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        for (line_no, (line, total)) in validated.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO milling_outputs
                    (batch_id, package_type, unit_weight_kg, package_count, total_weight_kg, line_no)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(batch_id)
            .bind(line.package_type.trim())
            .bind(line.unit_weight_kg)
            .bind(line.package_count)
            .bind(total)
            .bind(line_no as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let total_output_kg: Decimal = validated.iter().map(|(_, total)| *total).sum();
        tracing::info!(
            batch_id = %batch_id,
            lines = validated.len(),
            total_output_kg = %total_output_kg,
            "packaging replaced"
        );
        self.get(batch_id).await
    }

    /// Lock a batch against further changes
    pub async fn close(&self, batch_id: Uuid) -> AppResult<MillingBatchDetail> {
        let mut tx = self.db.begin().await?;
        lock_batch(&mut tx, batch_id).await?;
        set_closed(&mut tx, batch_id, true).await?;
        tx.commit().await?;

        tracing::info!(batch_id = %batch_id, "milling batch closed");
        self.get(batch_id).await
    }

    /// Unlock a closed batch for corrections
    pub async fn reopen(&self, batch_id: Uuid) -> AppResult<MillingBatchDetail> {
        let mut tx = self.db.begin().await?;
        lock_batch(&mut tx, batch_id).await?;
        set_closed(&mut tx, batch_id, false).await?;
        tx.commit().await?;

        tracing::info!(batch_id = %batch_id, "milling batch reopened");
        self.get(batch_id).await
    }

    /// Delete an open batch, returning its input stock to AVAILABLE
    pub async fn delete_batch(&self, batch_id: Uuid) -> AppResult<BatchDeletion> {
        let mut tx = self.db.begin().await?;

        let batch = lock_batch(&mut tx, batch_id).await?;
        batch.ensure_deletable()?;

        let member_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM stocks WHERE milling_batch_id = $1 ORDER BY id",
        )
        .bind(batch_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut members = lock_stocks(&mut tx, &member_ids).await?;
        for stock in members.iter_mut() {
            stock.return_to_available();
            write_links(&mut tx, stock).await?;
        }

        let deleted_outputs = sqlx::query("DELETE FROM milling_outputs WHERE batch_id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM milling_batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch_id,
            released_stock = members.len(),
            deleted_outputs,
            "milling batch deleted"
        );
        Ok(BatchDeletion {
            id: batch_id,
            released_stock_ids: members.into_iter().map(|s| s.id).collect(),
            deleted_outputs,
        })
    }

    /// Batch with input stock, packaging lines and yield
    pub async fn get(&self, batch_id: Uuid) -> AppResult<MillingBatchDetail> {
        let mut conn = self.db.acquire().await?;

        let batch: MillingBatch = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM milling_batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(MillingBatch::from)
        .ok_or_else(|| AppError::NotFound("Milling batch".to_string()))?;

        let stocks = views_where(&mut conn, "s.milling_batch_id", batch_id).await?;
        let outputs = outputs_of(&mut conn, batch_id).await?;

        Ok(MillingBatchDetail {
            yield_percent: milling_yield(&batch, &outputs),
            total_output_kg: total_output_weight(&outputs),
            batch,
            stocks,
            outputs,
        })
    }

    /// Batches newest first with their output totals
    pub async fn list(&self) -> AppResult<Vec<MillingBatchSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT b.id, b.milling_date, b.title, b.remarks, b.milling_type, b.total_input_kg,
                   b.is_closed, b.created_at, b.updated_at,
                   (SELECT COUNT(*) FROM stocks s WHERE s.milling_batch_id = b.id) AS stock_count,
                   (SELECT COUNT(*) FROM milling_outputs o WHERE o.batch_id = b.id) AS output_lines,
                   (SELECT COALESCE(SUM(o.total_weight_kg), 0) FROM milling_outputs o
                     WHERE o.batch_id = b.id) AS total_output_kg
            FROM milling_batches b
            ORDER BY b.milling_date DESC, b.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let batch = MillingBatch::from(row.batch);
                MillingBatchSummary {
                    yield_percent: batch_yield(&batch, row.output_lines as usize, row.total_output_kg),
                    stock_count: row.stock_count,
                    total_output_kg: row.total_output_kg,
                    batch,
                }
            })
            .collect())
    }
}
