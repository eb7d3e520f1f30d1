//! HTTP handlers for the stock ledger

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    BulkOutcome, NewStock, PaginatedResponse, Pagination, StockChanges, StockFilter, StockSort,
    StockStatus, StockView,
};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::import::export_csv;
use crate::services::stock::{StockDeletion, StockService};
use crate::AppState;

/// Filter and paging query parameters for stock lists
#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub year: Option<i32>,
    pub variety_id: Option<Uuid>,
    pub producer_id: Option<Uuid>,
    pub producer_name: Option<String>,
    pub status: Option<StockStatus>,
    pub cert_type: Option<String>,
    pub sort: Option<StockSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl StockQuery {
    pub fn filter(&self) -> StockFilter {
        StockFilter {
            year: self.year,
            variety_id: self.variety_id,
            producer_id: self.producer_id,
            producer_name: self.producer_name.clone(),
            status: self.status,
            cert_type: self.cert_type.clone(),
            sort: self.sort.unwrap_or_default(),
        }
    }

    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

fn service(state: AppState) -> StockService {
    StockService::new(state.db, state.config.inventory)
}

/// List stock with filters and paging
pub async fn list_stocks(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<PaginatedResponse<StockView>>> {
    check_permission(&current_user, "stock", "read")?;
    let page = service(state).list(&query.filter(), query.pagination()).await?;
    Ok(Json(page))
}

/// Get one stock
pub async fn get_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<StockView>> {
    check_permission(&current_user, "stock", "read")?;
    let stock = service(state).get(stock_id).await?;
    Ok(Json(stock))
}

/// Register a stock
pub async fn create_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewStock>,
) -> AppResult<Json<StockView>> {
    check_permission(&current_user, "stock", "write")?;
    let stock = service(state).create(input).await?;
    Ok(Json(stock))
}

/// Edit a stock
pub async fn update_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
    Json(changes): Json<StockChanges>,
) -> AppResult<Json<StockView>> {
    check_permission(&current_user, "stock", "write")?;
    let stock = service(state).update(stock_id, changes).await?;
    Ok(Json(stock))
}

/// Delete a stock
pub async fn delete_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<StockDeletion>> {
    check_permission(&current_user, "stock", "write")?;
    let deletion = service(state).delete(stock_id).await?;
    Ok(Json(deletion))
}

/// Delete several stocks, reporting the ones that were skipped
pub async fn bulk_delete_stocks(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkOutcome>> {
    check_permission(&current_user, "stock", "write")?;
    let outcome = service(state).bulk_delete(input.ids).await?;
    Ok(Json(outcome))
}

/// Download the filtered stock list as CSV
pub async fn export_stocks(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StockQuery>,
) -> AppResult<impl IntoResponse> {
    check_permission(&current_user, "stock", "read")?;
    let rows = service(state).list_all(&query.filter()).await?;
    let body = export_csv(&rows)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"stocks.csv\""),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_first_page_newest_first() {
        let query = StockQuery::default();
        assert_eq!(query.pagination(), Pagination::default());
        assert_eq!(query.filter(), StockFilter::default());
    }

    #[test]
    fn query_carries_filters() {
        let query = StockQuery {
            year: Some(2024),
            status: Some(StockStatus::Released),
            sort: Some(StockSort::WeightAsc),
            per_page: Some(20),
            ..Default::default()
        };
        let filter = query.filter();
        assert_eq!(filter.year, Some(2024));
        assert_eq!(filter.status, Some(StockStatus::Released));
        assert_eq!(filter.sort, StockSort::WeightAsc);
        assert_eq!(query.pagination().per_page, 20);
    }
}
