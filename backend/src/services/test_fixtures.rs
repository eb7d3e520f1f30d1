//! Reference data and stock seeding for database-backed service tests

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{NewStock, StockStatus};

use crate::config::InventoryConfig;
use crate::services::StockService;

pub(crate) fn limits() -> InventoryConfig {
    InventoryConfig::default()
}

pub(crate) fn kg(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) async fn insert_group(pool: &PgPool, code: &str, year: i32, certification_type: &str) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO producer_groups (code, name, year, certification_type, certification_number)
        VALUES ($1, $2, $3, $4, '12-3-45')
        RETURNING id
        "#,
    )
    .bind(code)
    .bind(format!("{} 작목반", code))
    .bind(year)
    .bind(certification_type)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub(crate) async fn insert_producer(pool: &PgPool, group_id: Option<Uuid>, producer_no: i32, name: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO producers (group_id, producer_no, name) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(group_id)
    .bind(producer_no)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub(crate) async fn insert_variety(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO varieties (name, variety_type) VALUES ($1, '메벼') RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// One organic producer and one variety, enough for most flows
pub(crate) struct Farm {
    pub producer_id: Uuid,
    pub variety_id: Uuid,
}

pub(crate) async fn organic_farm(pool: &PgPool) -> Farm {
    let group = insert_group(pool, "JB01", 2024, "유기농").await;
    Farm {
        producer_id: insert_producer(pool, Some(group), 12, "김철수").await,
        variety_id: insert_variety(pool, "신동진").await,
    }
}

/// Register an AVAILABLE stock through the ledger and return its id
pub(crate) async fn register(pool: &PgPool, farm: &Farm, bag_no: i32, weight: &str) -> Uuid {
    StockService::new(pool.clone(), limits())
        .create(NewStock {
            production_year: 2024,
            producer_id: farm.producer_id,
            variety_id: farm.variety_id,
            bag_no,
            weight_kg: kg(weight),
            incoming_date: day(2024, 10, 1),
        })
        .await
        .unwrap()
        .stock
        .id
}

pub(crate) async fn status_of(pool: &PgPool, stock_id: Uuid) -> (StockStatus, Option<Uuid>, Option<Uuid>) {
    let (status, batch_id, release_id): (String, Option<Uuid>, Option<Uuid>) = sqlx::query_as(
        "SELECT status, milling_batch_id, release_id FROM stocks WHERE id = $1",
    )
    .bind(stock_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (StockStatus::parse(&status).unwrap(), batch_id, release_id)
}

/// Batch total as stored next to the sum of its linked stock
pub(crate) async fn stored_and_linked_total(pool: &PgPool, batch_id: Uuid) -> (Decimal, Decimal) {
    sqlx::query_as(
        r#"
        SELECT b.total_input_kg,
               (SELECT COALESCE(SUM(s.weight_kg), 0) FROM stocks s WHERE s.milling_batch_id = b.id)
        FROM milling_batches b
        WHERE b.id = $1
        "#,
    )
    .bind(batch_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub(crate) async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
