//! HTTP handlers for milling batches

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{MillingBatchDetail, MillingBatchSummary, NewMillingBatch, PackagingLine, StockMovement};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::milling::BatchDeletion;
use crate::services::MillingService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MoveStockRequest {
    pub stock_id: Uuid,
    pub direction: StockMovement,
}

#[derive(Debug, Deserialize)]
pub struct SetPackagingRequest {
    pub outputs: Vec<PackagingLine>,
}

/// List milling batches
pub async fn list_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MillingBatchSummary>>> {
    check_permission(&current_user, "milling", "read")?;
    let batches = MillingService::new(state.db).list().await?;
    Ok(Json(batches))
}

/// Send stock to milling
pub async fn start_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewMillingBatch>,
) -> AppResult<Json<MillingBatchDetail>> {
    check_permission(&current_user, "milling", "write")?;
    let batch = MillingService::new(state.db).start_batch(input).await?;
    Ok(Json(batch))
}

/// Get a batch with input, output and yield
pub async fn get_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<MillingBatchDetail>> {
    check_permission(&current_user, "milling", "read")?;
    let batch = MillingService::new(state.db).get(batch_id).await?;
    Ok(Json(batch))
}

/// Delete an open batch
pub async fn delete_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<BatchDeletion>> {
    check_permission(&current_user, "milling", "write")?;
    let deletion = MillingService::new(state.db).delete_batch(batch_id).await?;
    Ok(Json(deletion))
}

/// Add a stock to a batch or take it out
pub async fn move_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<MoveStockRequest>,
) -> AppResult<Json<MillingBatchDetail>> {
    check_permission(&current_user, "milling", "write")?;
    let batch = MillingService::new(state.db)
        .move_stock(batch_id, input.stock_id, input.direction)
        .await?;
    Ok(Json(batch))
}

/// Replace the packaging output of a batch
pub async fn set_packaging(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<SetPackagingRequest>,
) -> AppResult<Json<MillingBatchDetail>> {
    check_permission(&current_user, "milling", "write")?;
    let batch = MillingService::new(state.db)
        .set_packaging(batch_id, input.outputs)
        .await?;
    Ok(Json(batch))
}

/// Close a batch
pub async fn close_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<MillingBatchDetail>> {
    check_permission(&current_user, "milling", "write")?;
    let batch = MillingService::new(state.db).close(batch_id).await?;
    Ok(Json(batch))
}

/// Reopen a closed batch
pub async fn reopen_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<MillingBatchDetail>> {
    check_permission(&current_user, "milling", "write")?;
    let batch = MillingService::new(state.db).reopen(batch_id).await?;
    Ok(Json(batch))
}
