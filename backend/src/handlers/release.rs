//! HTTP handlers for releases

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::{NewRelease, ReleaseChanges, ReleaseDetail, ReleaseRemoval, ReleaseSummary};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::release::{ReleaseCancellation, ReleasesDeletion};
use crate::services::ReleaseService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReleaseListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CancelReleaseRequest {
    pub stock_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteReleasesRequest {
    pub ids: Vec<Uuid>,
}

fn service(state: AppState) -> ReleaseService {
    ReleaseService::new(state.db, state.config.inventory)
}

/// List releases, optionally within a date window
pub async fn list_releases(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ReleaseListQuery>,
) -> AppResult<Json<Vec<ReleaseSummary>>> {
    check_permission(&current_user, "release", "read")?;
    let releases = service(state).list(query.from, query.to).await?;
    Ok(Json(releases))
}

/// Release stock
pub async fn create_release(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewRelease>,
) -> AppResult<Json<ReleaseDetail>> {
    check_permission(&current_user, "release", "write")?;
    let release = service(state).create(input).await?;
    Ok(Json(release))
}

/// Get a release with its stock
pub async fn get_release(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(release_id): Path<Uuid>,
) -> AppResult<Json<ReleaseDetail>> {
    check_permission(&current_user, "release", "read")?;
    let release = service(state).get(release_id).await?;
    Ok(Json(release))
}

/// Edit date, destination and purpose of a release
pub async fn update_release(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(release_id): Path<Uuid>,
    Json(changes): Json<ReleaseChanges>,
) -> AppResult<Json<ReleaseDetail>> {
    check_permission(&current_user, "release", "write")?;
    let release = service(state).update(release_id, changes).await?;
    Ok(Json(release))
}

/// Return released stock to AVAILABLE
pub async fn cancel_release(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CancelReleaseRequest>,
) -> AppResult<Json<ReleaseCancellation>> {
    check_permission(&current_user, "release", "write")?;
    let cancellation = service(state).cancel(input.stock_ids).await?;
    Ok(Json(cancellation))
}

/// Delete releases and return their stock
pub async fn delete_releases(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DeleteReleasesRequest>,
) -> AppResult<Json<ReleasesDeletion>> {
    check_permission(&current_user, "release", "write")?;
    let deletion = service(state).delete_releases(input.ids).await?;
    Ok(Json(deletion))
}

/// Take one stock out of its release
pub async fn remove_release_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<ReleaseRemoval>> {
    check_permission(&current_user, "release", "write")?;
    let outcome = service(state).remove_stock(stock_id).await?;
    Ok(Json(outcome))
}
