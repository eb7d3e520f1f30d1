//! Stock ledger service: registration, edits, deletion and filtered lists

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use shared::{
    certification_or_general, lot_code_for_stock, validate_bulk_size, BulkOutcome, LedgerError,
    NewStock, PaginatedResponse, Pagination, PaginationMeta, ReleaseRemoval, Stock, StockChanges,
    StockFilter, StockKey, StockSort, StockStatus, StockView, CERTIFICATION_TRIM_CHARS,
    GENERAL_CERTIFICATION,
};

use crate::config::InventoryConfig;
use crate::error::{AppError, AppResult};
use crate::services::{bulk::Deadline, milling, reference, release};

/// SQL for the certification type with missing groups folded into the
/// general bucket. Trims the same characters as [`shared::trim_certification`], so
/// keys computed in SQL and in Rust agree.
pub(crate) fn cert_expr() -> String {
    let trim: String = CERTIFICATION_TRIM_CHARS.iter().collect();
    format!(
        "COALESCE(NULLIF(btrim(pg.certification_type, '{}'), ''), '{}')",
        trim, GENERAL_CERTIFICATION
    )
}

pub(crate) const STOCK_COLUMNS: &str = "s.id, s.production_year, s.producer_id, s.variety_id, \
     s.bag_no, s.weight_kg, s.incoming_date, s.status, s.lot_code, s.milling_batch_id, \
     s.release_id, s.created_at, s.updated_at";

const STOCK_RETURNING: &str = "id, production_year, producer_id, variety_id, bag_no, weight_kg, \
     incoming_date, status, lot_code, milling_batch_id, release_id, created_at, updated_at";

pub(crate) const STOCK_VIEW_FROM: &str = " FROM stocks s \
     JOIN producers p ON p.id = s.producer_id \
     JOIN varieties v ON v.id = s.variety_id \
     LEFT JOIN producer_groups pg ON pg.id = p.group_id";

/// SELECT list for [`StockViewRow`]
pub(crate) fn stock_view_select() -> String {
    format!(
        "SELECT {}, p.name AS producer_name, v.name AS variety_name, \
         {} AS certification_type, pg.code AS group_code{}",
        STOCK_COLUMNS, cert_expr(), STOCK_VIEW_FROM
    )
}

/// Database row for a stock
#[derive(Debug, Clone, FromRow)]
pub(crate) struct StockRow {
    id: Uuid,
    production_year: i32,
    producer_id: Uuid,
    variety_id: Uuid,
    bag_no: i32,
    weight_kg: Decimal,
    incoming_date: NaiveDate,
    status: String,
    lot_code: Option<String>,
    milling_batch_id: Option<Uuid>,
    release_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StockRow> for Stock {
    type Error = AppError;

    fn try_from(row: StockRow) -> Result<Self, Self::Error> {
        let status = StockStatus::parse(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown stock status '{}'", row.status)))?;
        Ok(Stock {
            id: row.id,
            production_year: row.production_year,
            producer_id: row.producer_id,
            variety_id: row.variety_id,
            bag_no: row.bag_no,
            weight_kg: row.weight_kg,
            incoming_date: row.incoming_date,
            status,
            lot_code: row.lot_code,
            milling_batch_id: row.milling_batch_id,
            release_id: row.release_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a stock joined with producer, variety and group
#[derive(Debug, Clone, FromRow)]
pub(crate) struct StockViewRow {
    #[sqlx(flatten)]
    stock: StockRow,
    producer_name: String,
    variety_name: String,
    certification_type: String,
    group_code: Option<String>,
}

impl TryFrom<StockViewRow> for StockView {
    type Error = AppError;

    fn try_from(row: StockViewRow) -> Result<Self, Self::Error> {
        Ok(StockView {
            stock: row.stock.try_into()?,
            producer_name: row.producer_name,
            variety_name: row.variety_name,
            certification_type: row.certification_type,
            group_code: row.group_code,
        })
    }
}

pub(crate) fn into_views(rows: Vec<StockViewRow>) -> AppResult<Vec<StockView>> {
    rows.into_iter().map(StockView::try_from).collect()
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Append the WHERE clause for `filter` to a query over [`STOCK_VIEW_FROM`]
pub(crate) fn push_stock_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &StockFilter) {
    qb.push(" WHERE TRUE");
    if let Some(year) = filter.year {
        qb.push(" AND s.production_year = ").push_bind(year);
    }
    if let Some(variety_id) = filter.variety_id {
        qb.push(" AND s.variety_id = ").push_bind(variety_id);
    }
    if let Some(producer_id) = filter.producer_id {
        qb.push(" AND s.producer_id = ").push_bind(producer_id);
    }
    if let Some(needle) = filter.producer_name_needle() {
        qb.push(" AND p.name ILIKE ")
            .push_bind(format!("%{}%", escape_like(needle)));
    }
    if let Some(status) = filter.status {
        qb.push(" AND s.status = ").push_bind(status.as_str());
    }
    if let Some(cert) = filter.cert_type_filter() {
        qb.push(format!(" AND {} = ", cert_expr()))
            .push_bind(certification_or_general(Some(cert)));
    }
}

pub(crate) fn order_clause(sort: StockSort) -> &'static str {
    match sort {
        StockSort::CreatedDesc => " ORDER BY s.created_at DESC, s.id DESC",
        StockSort::CreatedAsc => " ORDER BY s.created_at ASC, s.id ASC",
        StockSort::WeightDesc => " ORDER BY s.weight_kg DESC, s.id DESC",
        StockSort::WeightAsc => " ORDER BY s.weight_kg ASC, s.id ASC",
    }
}

/// Lock the given stocks for the rest of the transaction.
/// Rows are locked in id order so concurrent callers cannot deadlock.
pub(crate) async fn lock_stocks(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<Vec<Stock>> {
    let rows = sqlx::query_as::<_, StockRow>(&format!(
        "SELECT {} FROM stocks s WHERE s.id = ANY($1) ORDER BY s.id FOR UPDATE",
        STOCK_COLUMNS
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Stock::try_from).collect()
}

pub(crate) async fn lock_stock(conn: &mut PgConnection, id: Uuid) -> AppResult<Stock> {
    lock_stocks(conn, &[id])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Stock".to_string()))
}

/// Batch and release a stock currently points at, read without locking.
/// Callers lock the owning batch or release first and then re-check the
/// locked stock row against this, keeping parent-before-stock lock order.
pub(crate) async fn current_links(
    conn: &mut PgConnection,
    id: Uuid,
) -> AppResult<(Option<Uuid>, Option<Uuid>)> {
    sqlx::query_as::<_, (Option<Uuid>, Option<Uuid>)>(
        "SELECT milling_batch_id, release_id FROM stocks WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Stock".to_string()))
}

pub(crate) fn ensure_links_unchanged(
    stock: &Stock,
    links: (Option<Uuid>, Option<Uuid>),
) -> AppResult<()> {
    if (stock.milling_batch_id, stock.release_id) != links {
        return Err(AppError::Conflict(format!(
            "Stock {} changed while this request was running; retry",
            stock.label()
        )));
    }
    Ok(())
}

/// Persist status and references of a stock after a lifecycle transition
pub(crate) async fn write_links(conn: &mut PgConnection, stock: &Stock) -> AppResult<()> {
    stock.check_links()?;
    sqlx::query(
        "UPDATE stocks SET status = $1, milling_batch_id = $2, release_id = $3 WHERE id = $4",
    )
    .bind(stock.status.as_str())
    .bind(stock.milling_batch_id)
    .bind(stock.release_id)
    .bind(stock.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Stock rows joined for display, restricted by a single-id condition
pub(crate) async fn views_where(
    conn: &mut PgConnection,
    condition: &str,
    id: Uuid,
) -> AppResult<Vec<StockView>> {
    let rows = sqlx::query_as::<_, StockViewRow>(&format!(
        "{} WHERE {} = $1 ORDER BY p.name, s.bag_no",
        stock_view_select(),
        condition
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    into_views(rows)
}

async fn ensure_key_free(
    conn: &mut PgConnection,
    key: &StockKey,
    except: Option<Uuid>,
) -> AppResult<()> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM stocks
            WHERE production_year = $1 AND producer_id = $2 AND variety_id = $3 AND bag_no = $4
              AND ($5::uuid IS NULL OR id <> $5)
        )
        "#,
    )
    .bind(key.production_year)
    .bind(key.producer_id)
    .bind(key.variety_id)
    .bind(key.bag_no)
    .bind(except)
    .fetch_one(&mut *conn)
    .await?;

    if taken {
        return Err(LedgerError::DuplicateKey(format!(
            "Stock {} bag #{} for this producer and variety",
            key.production_year, key.bag_no
        ))
        .into());
    }
    Ok(())
}

/// Result of deleting one stock
#[derive(Debug, Clone, Serialize)]
pub struct StockDeletion {
    pub id: Uuid,
    /// Set when the stock was part of a release
    pub release: Option<ReleaseRemoval>,
}

/// Stock ledger service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    limits: InventoryConfig,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool, limits: InventoryConfig) -> Self {
        Self { db, limits }
    }

    /// List stock matching the filters, one page at a time
    pub async fn list(
        &self,
        filter: &StockFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockView>> {
        let pagination = pagination.clamped(self.limits.max_page_size);

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){}", STOCK_VIEW_FROM));
        push_stock_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        let mut qb = QueryBuilder::<Postgres>::new(stock_view_select());
        push_stock_filters(&mut qb, filter);
        qb.push(order_clause(filter.sort));
        qb.push(" LIMIT ").push_bind(pagination.limit());
        qb.push(" OFFSET ").push_bind(pagination.offset());
        let rows = qb.build_query_as::<StockViewRow>().fetch_all(&self.db).await?;

        Ok(PaginatedResponse {
            data: into_views(rows)?,
            pagination: PaginationMeta::new(pagination, total.max(0) as u64),
        })
    }

    /// Every stock matching the filters, used by the CSV export
    pub async fn list_all(&self, filter: &StockFilter) -> AppResult<Vec<StockView>> {
        let mut qb = QueryBuilder::<Postgres>::new(stock_view_select());
        push_stock_filters(&mut qb, filter);
        qb.push(order_clause(filter.sort));
        let rows = qb.build_query_as::<StockViewRow>().fetch_all(&self.db).await?;
        into_views(rows)
    }

    /// Get one stock with its producer, variety and certification
    pub async fn get(&self, id: Uuid) -> AppResult<StockView> {
        let row = sqlx::query_as::<_, StockViewRow>(&format!("{} WHERE s.id = $1", stock_view_select()))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;
        row.try_into()
    }

    /// Register a new stock as AVAILABLE
    pub async fn create(&self, input: NewStock) -> AppResult<StockView> {
        let mut tx = self.db.begin().await?;
        let stock = Self::insert_stock(&mut tx, &input).await?;
        tx.commit().await?;

        tracing::info!(
            stock_id = %stock.id,
            production_year = stock.production_year,
            bag_no = stock.bag_no,
            weight_kg = %stock.weight_kg,
            lot_code = stock.lot_code.as_deref().unwrap_or("-"),
            "stock registered"
        );
        self.get(stock.id).await
    }

    /// Validate and insert a stock inside the caller's transaction
    pub(crate) async fn insert_stock(conn: &mut PgConnection, input: &NewStock) -> AppResult<Stock> {
        input.validate()?;

        let producer = reference::producer_profile(conn, input.producer_id).await?;
        let variety = reference::variety(conn, input.variety_id).await?;
        ensure_key_free(conn, &input.key(), None).await?;

        let lot_code = lot_code_for_stock(input.incoming_date, &variety, &producer)?;

        let row = sqlx::query_as::<_, StockRow>(&format!(
            r#"
            INSERT INTO stocks (production_year, producer_id, variety_id, bag_no, weight_kg,
                                incoming_date, status, lot_code)
            VALUES ($1, $2, $3, $4, $5, $6, 'AVAILABLE', $7)
            RETURNING {}
            "#,
            STOCK_RETURNING
        ))
        .bind(input.production_year)
        .bind(input.producer_id)
        .bind(input.variety_id)
        .bind(input.bag_no)
        .bind(input.weight_kg)
        .bind(input.incoming_date)
        .bind(&lot_code)
        .fetch_one(&mut *conn)
        .await?;

        row.try_into()
    }

    /// Edit a stock's fields, keeping its batch total and lot code in step
    pub async fn update(&self, id: Uuid, changes: StockChanges) -> AppResult<StockView> {
        let mut tx = self.db.begin().await?;

        let links = current_links(&mut tx, id).await?;
        if let (Some(batch_id), _) = links {
            milling::lock_batch(&mut tx, batch_id).await?.ensure_open()?;
        }
        let current = lock_stock(&mut tx, id).await?;
        ensure_links_unchanged(&current, links)?;

        let edit = changes.apply(&current)?;
        if edit.key_changed {
            ensure_key_free(&mut tx, &edit.updated.key(), Some(id)).await?;
        }

        let lot_code = if edit.lot_code_stale {
            let producer = reference::producer_profile(&mut tx, edit.updated.producer_id).await?;
            let variety = reference::variety(&mut tx, edit.updated.variety_id).await?;
            lot_code_for_stock(edit.updated.incoming_date, &variety, &producer)?
        } else {
            current.lot_code.clone()
        };

        sqlx::query(
            r#"
            UPDATE stocks
            SET production_year = $1, producer_id = $2, variety_id = $3, bag_no = $4,
                weight_kg = $5, incoming_date = $6, lot_code = $7
            WHERE id = $8
            "#,
        )
        .bind(edit.updated.production_year)
        .bind(edit.updated.producer_id)
        .bind(edit.updated.variety_id)
        .bind(edit.updated.bag_no)
        .bind(edit.updated.weight_kg)
        .bind(edit.updated.incoming_date)
        .bind(&lot_code)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(batch_id) = current.milling_batch_id {
            if !edit.weight_delta.is_zero() {
                sqlx::query(
                    "UPDATE milling_batches SET total_input_kg = total_input_kg + $1 WHERE id = $2",
                )
                .bind(edit.weight_delta)
                .bind(batch_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            stock_id = %id,
            weight_delta = %edit.weight_delta,
            lot_code_recomputed = edit.lot_code_stale,
            "stock updated"
        );
        self.get(id).await
    }

    /// Delete an AVAILABLE or RELEASED stock
    pub async fn delete(&self, id: Uuid) -> AppResult<StockDeletion> {
        let mut tx = self.db.begin().await?;

        let links = current_links(&mut tx, id).await?;
        if let (_, Some(release_id)) = links {
            release::lock_release(&mut tx, release_id).await?;
        }
        let stock = lock_stock(&mut tx, id).await?;
        ensure_links_unchanged(&stock, links)?;
        stock.ensure_deletable()?;

        sqlx::query("DELETE FROM stocks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let release = match stock.release_id {
            Some(release_id) => Some(release::drop_release_if_empty(&mut tx, release_id).await?),
            None => None,
        };

        tx.commit().await?;

        tracing::info!(stock_id = %id, status = stock.status.as_str(), "stock deleted");
        Ok(StockDeletion { id, release })
    }

    /// Delete each stock independently and report which ones could not be
    /// deleted. Items not reached before the time budget runs out are
    /// reported as failed with a timeout reason.
    pub async fn bulk_delete(&self, ids: Vec<Uuid>) -> AppResult<BulkOutcome> {
        validate_bulk_size("ids", ids.len(), self.limits.bulk_max_items)?;

        let deadline = Deadline::after(self.limits.bulk_timeout());
        let mut seen = HashSet::new();
        let mut outcome = BulkOutcome::default();

        for id in ids.into_iter().filter(|id| seen.insert(*id)) {
            match deadline.run("bulk delete", self.delete(id)).await {
                Ok(_) => outcome.record_success(id),
                Err(err) => {
                    let err = err.into_ledger_error();
                    tracing::warn!(stock_id = %id, reason = %err, "stock not deleted");
                    outcome.record_failure(id, &err);
                }
            }
        }

        tracing::info!(
            deleted = outcome.succeeded.len(),
            skipped = outcome.failed.len(),
            "bulk stock delete finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_push_only_given_conditions() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_stock_filters(&mut qb, &StockFilter::default());
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");

        let filter = StockFilter {
            year: Some(2024),
            producer_name: Some("김".to_string()),
            status: Some(StockStatus::Available),
            cert_type: Some("일반".to_string()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_stock_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("s.production_year = $1"));
        assert!(sql.contains("p.name ILIKE $2"));
        assert!(sql.contains("s.status = $3"));
        assert!(sql.contains(&format!("{} = $4", cert_expr())));
        assert!(!sql.contains("s.variety_id"));
    }

    #[test]
    fn blank_text_filters_are_ignored() {
        let filter = StockFilter {
            producer_name: Some("   ".to_string()),
            cert_type: Some(String::new()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_stock_filters(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");
    }

    #[test]
    fn cert_expression_trims_every_rust_whitespace() {
        let expr = cert_expr();
        let trim_arg = expr
            .split_once("btrim(pg.certification_type, '")
            .and_then(|(_, rest)| rest.split_once('\''))
            .map(|(chars, _)| chars)
            .unwrap();
        assert_eq!(trim_arg.chars().count(), CERTIFICATION_TRIM_CHARS.len());
        assert!(trim_arg.contains('\t'));
        assert!(trim_arg.contains('\u{3000}'));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }

    #[test]
    fn every_sort_has_a_tiebreaker() {
        for sort in [
            StockSort::CreatedDesc,
            StockSort::CreatedAsc,
            StockSort::WeightDesc,
            StockSort::WeightAsc,
        ] {
            assert!(order_clause(sort).contains("s.id"));
        }
    }

    mod with_database {
        use super::*;
        use crate::services::test_fixtures::*;
        use crate::services::{MillingService, ReleaseService};
        use shared::{NewMillingBatch, NewRelease};

        fn new_stock(farm: &Farm, bag_no: i32) -> NewStock {
            NewStock {
                production_year: 2024,
                producer_id: farm.producer_id,
                variety_id: farm.variety_id,
                bag_no,
                weight_kg: kg("800"),
                incoming_date: day(2024, 10, 1),
            }
        }

        #[sqlx::test]
        async fn registers_with_lot_code_and_rejects_duplicates(pool: PgPool) {
            let farm = organic_farm(&pool).await;
            let service = StockService::new(pool.clone(), limits());

            let view = service.create(new_stock(&farm, 10)).await.unwrap();
            assert_eq!(view.stock.status, StockStatus::Available);
            assert_eq!(view.stock.lot_code.as_deref(), Some("241001-12-12345-JB010012"));
            assert_eq!(view.certification_type, "유기농");

            let err = service.create(new_stock(&farm, 10)).await.unwrap_err();
            assert!(matches!(err, AppError::DuplicateEntry(_)));
        }

        #[sqlx::test]
        async fn wide_producer_number_is_refused_before_insert(pool: PgPool) {
            let group = insert_group(&pool, "A1", 2024, "유기농").await;
            let farm = Farm {
                producer_id: insert_producer(&pool, Some(group), 12345, "박영수").await,
                variety_id: insert_variety(&pool, "신동진").await,
            };

            let err = StockService::new(pool.clone(), limits())
                .create(new_stock(&farm, 1))
                .await
                .unwrap_err();

            assert!(matches!(err, AppError::Validation { ref field, .. } if field == "producer_no"));
            assert_eq!(count_rows(&pool, "stocks").await, 0);
        }

        #[sqlx::test]
        async fn padded_certification_types_match_their_filter(pool: PgPool) {
            let padded = insert_group(&pool, "P1", 2024, "유기농\u{3000}").await;
            let blank = insert_group(&pool, "P2", 2024, "\t").await;
            let variety_id = insert_variety(&pool, "신동진").await;
            let organic = Farm {
                producer_id: insert_producer(&pool, Some(padded), 1, "김철수").await,
                variety_id,
            };
            let general = Farm {
                producer_id: insert_producer(&pool, Some(blank), 2, "이영희").await,
                variety_id,
            };
            let service = StockService::new(pool.clone(), limits());
            let organic_view = service.create(new_stock(&organic, 1)).await.unwrap();
            let general_view = service.create(new_stock(&general, 1)).await.unwrap();

            assert_eq!(organic_view.certification_type, "유기농");
            assert!(organic_view.stock.lot_code.is_some());
            assert_eq!(general_view.certification_type, "일반");
            assert_eq!(general_view.stock.lot_code, None);

            let general_only = StockFilter {
                cert_type: Some("일반".to_string()),
                ..Default::default()
            };
            let listed = service.list_all(&general_only).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].stock.id, general_view.stock.id);
        }

        #[sqlx::test]
        async fn bulk_delete_skips_consumed_stock(pool: PgPool) {
            let farm = organic_farm(&pool).await;
            let free = register(&pool, &farm, 1, "500").await;
            let used = register(&pool, &farm, 2, "300").await;
            MillingService::new(pool.clone())
                .start_batch(NewMillingBatch {
                    milling_date: day(2024, 11, 1),
                    title: "11월 도정".to_string(),
                    remarks: None,
                    milling_type: "백미".to_string(),
                    stock_ids: vec![used],
                })
                .await
                .unwrap();

            let outcome = StockService::new(pool.clone(), limits())
                .bulk_delete(vec![free, used])
                .await
                .unwrap();

            assert_eq!(outcome.succeeded, vec![free]);
            assert_eq!(outcome.failed.len(), 1);
            assert_eq!(outcome.failed[0].id, used);
            assert_eq!(outcome.failed[0].code, "CONFLICT");
            assert_eq!(outcome.summary("deleted"), "1 deleted, 1 skipped");
            assert_eq!(status_of(&pool, used).await.0, StockStatus::Consumed);
        }

        #[sqlx::test]
        async fn deleting_last_released_stock_drops_its_release(pool: PgPool) {
            let farm = organic_farm(&pool).await;
            let a = register(&pool, &farm, 1, "500").await;
            let release_id = ReleaseService::new(pool.clone(), limits())
                .create(NewRelease {
                    stock_ids: vec![a],
                    release_date: day(2024, 12, 1),
                    destination: "서울 물류센터".to_string(),
                    purpose: None,
                })
                .await
                .unwrap()
                .release
                .id;

            let deletion = StockService::new(pool.clone(), limits()).delete(a).await.unwrap();

            assert_eq!(deletion.release, Some(ReleaseRemoval::Deleted { release_id }));
            assert_eq!(count_rows(&pool, "stock_releases").await, 0);
        }
    }
}
