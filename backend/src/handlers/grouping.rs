//! HTTP handlers for the grouped stock overview

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{GroupKey, GroupOverview, StockFilter, StockStatus, StockView};

use crate::error::AppResult;
use crate::handlers::stock::StockQuery;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::GroupingService;
use crate::AppState;

/// Group key plus the filters the overview was computed with
#[derive(Debug, Deserialize)]
pub struct GroupMembersQuery {
    pub production_year: i32,
    pub variety_name: String,
    pub certification_type: Option<String>,
    pub year: Option<i32>,
    pub variety_id: Option<Uuid>,
    pub producer_id: Option<Uuid>,
    pub producer_name: Option<String>,
    pub status: Option<StockStatus>,
    pub cert_type: Option<String>,
}

impl GroupMembersQuery {
    fn key(&self) -> GroupKey {
        GroupKey::new(
            self.production_year,
            &self.variety_name,
            self.certification_type.as_deref(),
        )
    }

    fn filter(&self) -> StockFilter {
        StockFilter {
            year: self.year,
            variety_id: self.variety_id,
            producer_id: self.producer_id,
            producer_name: self.producer_name.clone(),
            status: self.status,
            cert_type: self.cert_type.clone(),
            ..Default::default()
        }
    }
}

/// Group summaries for the filtered stock
pub async fn list_groups(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<GroupOverview>> {
    check_permission(&current_user, "stock", "read")?;
    let overview = GroupingService::new(state.db)
        .compute_groups(&query.filter())
        .await?;
    Ok(Json(overview))
}

/// Members of one group, loaded when the group is expanded
pub async fn group_members(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<GroupMembersQuery>,
) -> AppResult<Json<Vec<StockView>>> {
    check_permission(&current_user, "stock", "read")?;
    let members = GroupingService::new(state.db)
        .resolve_members(&query.key(), &query.filter())
        .await?;
    Ok(Json(members))
}
