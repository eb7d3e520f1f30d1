//! Release engine: shipping stock out, cancelling and removing items,
//! editing and deleting releases

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{
    ensure_all_available, ensure_all_released, normalize_purpose, total_weight,
    validate_bulk_size, validate_destination, LedgerError, NewRelease, ReleaseChanges,
    ReleaseDetail, ReleaseRemoval, ReleaseSummary, StockRelease,
};

use crate::config::InventoryConfig;
use crate::error::{AppError, AppResult};
use crate::services::bulk;
use crate::services::stock::{
    current_links, ensure_links_unchanged, lock_stock, lock_stocks, views_where, write_links,
};

const RELEASE_COLUMNS: &str = "id, release_date, destination, purpose, created_at, updated_at";

/// Database row for a release
#[derive(Debug, FromRow)]
struct ReleaseRow {
    id: Uuid,
    release_date: NaiveDate,
    destination: String,
    purpose: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReleaseRow> for StockRelease {
    fn from(row: ReleaseRow) -> Self {
        StockRelease {
            id: row.id,
            release_date: row.release_date,
            destination: row.destination,
            purpose: row.purpose,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    release: ReleaseRow,
    item_count: i64,
    total_weight_kg: Decimal,
}

pub(crate) async fn lock_release(conn: &mut PgConnection, id: Uuid) -> AppResult<StockRelease> {
    sqlx::query_as::<_, ReleaseRow>(&format!(
        "SELECT {} FROM stock_releases WHERE id = $1 FOR UPDATE",
        RELEASE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(StockRelease::from)
    .ok_or_else(|| AppError::NotFound("Release".to_string()))
}

/// Delete a release once its last member has left it
pub(crate) async fn drop_release_if_empty(
    conn: &mut PgConnection,
    release_id: Uuid,
) -> AppResult<ReleaseRemoval> {
    lock_release(conn, release_id).await?;

    let remaining = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM stocks WHERE release_id = $1",
    )
    .bind(release_id)
    .fetch_one(&mut *conn)
    .await?;

    let outcome = ReleaseRemoval::after_removal(release_id, remaining);
    if outcome.release_deleted() {
        sqlx::query("DELETE FROM stock_releases WHERE id = $1")
            .bind(release_id)
            .execute(&mut *conn)
            .await?;
        tracing::info!(release_id = %release_id, "empty release deleted");
    }
    Ok(outcome)
}

/// Stock returned to AVAILABLE by a bulk cancel
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseCancellation {
    pub stock_ids: Vec<Uuid>,
    /// Releases the stock was taken out of; they are kept even when empty
    pub release_ids: Vec<Uuid>,
}

/// Result of deleting releases
#[derive(Debug, Clone, Serialize)]
pub struct ReleasesDeletion {
    pub release_ids: Vec<Uuid>,
    pub returned_stock_ids: Vec<Uuid>,
}

/// Release service
#[derive(Clone)]
pub struct ReleaseService {
    db: PgPool,
    limits: InventoryConfig,
}

impl ReleaseService {
    /// Create a new ReleaseService instance
    pub fn new(db: PgPool, limits: InventoryConfig) -> Self {
        Self { db, limits }
    }

    /// Create a release holding the selected AVAILABLE stock
    pub async fn create(&self, input: NewRelease) -> AppResult<ReleaseDetail> {
        input.validate()?;
        validate_bulk_size("stock_ids", input.stock_ids.len(), self.limits.bulk_max_items)?;
        let destination = validate_destination(&input.destination)?;

        let mut tx = self.db.begin().await?;

        let mut stocks = lock_stocks(&mut tx, &input.stock_ids).await?;
        let total_weight_kg = ensure_all_available(&input.stock_ids, &stocks)?;

        let release: StockRelease = sqlx::query_as::<_, ReleaseRow>(&format!(
            r#"
            INSERT INTO stock_releases (release_date, destination, purpose)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            RELEASE_COLUMNS
        ))
        .bind(input.release_date)
        .bind(&destination)
        .bind(normalize_purpose(input.purpose.as_deref()))
        .fetch_one(&mut *tx)
        .await?
        .into();

        for stock in stocks.iter_mut() {
            stock.release_to(release.id)?;
            write_links(&mut tx, stock).await?;
        }

        tx.commit().await?;

        tracing::info!(
            release_id = %release.id,
            stock_count = stocks.len(),
            total_weight_kg = %total_weight_kg,
            "stock released"
        );
        self.get(release.id).await
    }

    /// Return RELEASED stock to AVAILABLE. Releases left without members
    /// are not deleted here.
    pub async fn cancel(&self, stock_ids: Vec<Uuid>) -> AppResult<ReleaseCancellation> {
        validate_bulk_size("stock_ids", stock_ids.len(), self.limits.bulk_max_items)?;

        let mut tx = self.db.begin().await?;

        let mut stocks = lock_stocks(&mut tx, &stock_ids).await?;
        ensure_all_released(&stock_ids, &stocks)?;

        let release_ids: BTreeSet<Uuid> = stocks.iter().filter_map(|s| s.release_id).collect();
        for stock in stocks.iter_mut() {
            stock.return_to_available();
            write_links(&mut tx, stock).await?;
        }

        tx.commit().await?;

        tracing::info!(
            stock_count = stocks.len(),
            releases = release_ids.len(),
            "release cancelled"
        );
        Ok(ReleaseCancellation {
            stock_ids: stocks.into_iter().map(|s| s.id).collect(),
            release_ids: release_ids.into_iter().collect(),
        })
    }

    /// Take one stock out of its release, deleting the release if that
    /// was its last member
    pub async fn remove_stock(&self, stock_id: Uuid) -> AppResult<ReleaseRemoval> {
        let mut tx = self.db.begin().await?;

        let links = current_links(&mut tx, stock_id).await?;
        if let (_, Some(release_id)) = links {
            lock_release(&mut tx, release_id).await?;
        }
        let mut stock = lock_stock(&mut tx, stock_id).await?;
        ensure_links_unchanged(&stock, links)?;
        ensure_all_released(&[stock_id], std::slice::from_ref(&stock))?;
        let release_id = stock.release_id.ok_or_else(|| {
            LedgerError::InvalidState(format!("Stock {} has no release", stock.label()))
        })?;

        stock.return_to_available();
        write_links(&mut tx, &stock).await?;
        let outcome = drop_release_if_empty(&mut tx, release_id).await?;

        tx.commit().await?;

        tracing::info!(
            stock_id = %stock_id,
            release_id = %release_id,
            release_deleted = outcome.release_deleted(),
            "stock removed from release"
        );
        Ok(outcome)
    }

    /// Edit the descriptive fields of a release
    pub async fn update(&self, id: Uuid, changes: ReleaseChanges) -> AppResult<ReleaseDetail> {
        let destination = validate_destination(&changes.destination)?;

        let updated = sqlx::query(
            r#"
            UPDATE stock_releases
            SET release_date = $1, destination = $2, purpose = $3
            WHERE id = $4
            "#,
        )
        .bind(changes.release_date)
        .bind(&destination)
        .bind(normalize_purpose(changes.purpose.as_deref()))
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("Release".to_string()));
        }

        tracing::info!(release_id = %id, "release updated");
        self.get(id).await
    }

    /// Delete releases after returning every member stock to AVAILABLE.
    /// All or nothing, bounded by the bulk time budget.
    pub async fn delete_releases(&self, ids: Vec<Uuid>) -> AppResult<ReleasesDeletion> {
        validate_bulk_size("ids", ids.len(), self.limits.bulk_max_items)?;
        let ids: Vec<Uuid> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        let deletion =
            bulk::within(self.limits.bulk_timeout(), "delete releases", self.delete_in_tx(&ids))
                .await?;

        tracing::info!(
            releases = deletion.release_ids.len(),
            returned_stock = deletion.returned_stock_ids.len(),
            "releases deleted"
        );
        Ok(deletion)
    }

    async fn delete_in_tx(&self, ids: &[Uuid]) -> AppResult<ReleasesDeletion> {
        let mut tx = self.db.begin().await?;

        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM stock_releases WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;
        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(AppError::NotFound(format!("Release {}", missing)));
        }

        let member_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM stocks WHERE release_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut members = lock_stocks(&mut tx, &member_ids).await?;
        for stock in members.iter_mut() {
            stock.return_to_available();
            write_links(&mut tx, stock).await?;
        }

        sqlx::query("DELETE FROM stock_releases WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ReleasesDeletion {
            release_ids: found,
            returned_stock_ids: members.into_iter().map(|s| s.id).collect(),
        })
    }

    /// Release with its member stock
    pub async fn get(&self, id: Uuid) -> AppResult<ReleaseDetail> {
        let mut conn = self.db.acquire().await?;

        let release: StockRelease = sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {} FROM stock_releases WHERE id = $1",
            RELEASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(StockRelease::from)
        .ok_or_else(|| AppError::NotFound("Release".to_string()))?;

        let stocks = views_where(&mut conn, "s.release_id", id).await?;

        Ok(ReleaseDetail {
            total_weight_kg: total_weight(stocks.iter().map(|v| &v.stock)),
            release,
            stocks,
        })
    }

    /// Releases newest first, optionally within a release-date window
    pub async fn list(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<ReleaseSummary>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(LedgerError::validation("from", "Start date is after end date").into());
            }
        }

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT r.id, r.release_date, r.destination, r.purpose, r.created_at, r.updated_at,
                   COUNT(s.id) AS item_count,
                   COALESCE(SUM(s.weight_kg), 0) AS total_weight_kg
            FROM stock_releases r
            LEFT JOIN stocks s ON s.release_id = r.id
            WHERE ($1::date IS NULL OR r.release_date >= $1)
              AND ($2::date IS NULL OR r.release_date <= $2)
            GROUP BY r.id
            ORDER BY r.release_date DESC, r.created_at DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReleaseSummary {
                release: row.release.into(),
                item_count: row.item_count,
                total_weight_kg: row.total_weight_kg,
            })
            .collect())
    }
}
