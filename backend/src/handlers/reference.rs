//! HTTP handlers for reference data

use axum::{extract::State, Json};

use shared::{ProducerProfile, Variety};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::ReferenceService;
use crate::AppState;

/// List producers with their groups
pub async fn list_producers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProducerProfile>>> {
    check_permission(&current_user, "stock", "read")?;
    let producers = ReferenceService::new(state.db).list_producers().await?;
    Ok(Json(producers))
}

/// List varieties
pub async fn list_varieties(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Variety>>> {
    check_permission(&current_user, "stock", "read")?;
    let varieties = ReferenceService::new(state.db).list_varieties().await?;
    Ok(Json(varieties))
}
