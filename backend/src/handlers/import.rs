//! HTTP handlers for stock import

use axum::{extract::State, Json};
use serde::Deserialize;

use shared::{ImportReport, ImportRow};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::ImportService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

/// Import stock rows sent as JSON
pub async fn import_stocks(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ImportRequest>,
) -> AppResult<Json<ImportReport>> {
    check_permission(&current_user, "stock", "write")?;
    let report = ImportService::new(state.db, state.config.inventory)
        .import(input.rows)
        .await?;
    Ok(Json(report))
}

/// Import stock rows from a CSV body
pub async fn import_stocks_csv(
    State(state): State<AppState>,
    current_user: CurrentUser,
    body: String,
) -> AppResult<Json<ImportReport>> {
    check_permission(&current_user, "stock", "write")?;
    let report = ImportService::new(state.db, state.config.inventory)
        .import_csv(&body)
        .await?;
    Ok(Json(report))
}
