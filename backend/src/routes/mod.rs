//! Route definitions for the Rice Inventory Management System

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stock ledger, groups, import/export
        .nest("/stocks", stock_routes(state.clone()))
        // Protected routes - milling batches
        .nest("/milling", milling_routes(state.clone()))
        // Protected routes - releases
        .nest("/releases", release_routes(state.clone()))
        // Protected routes - reference data
        .nest("/reference", reference_routes(state))
}

/// Stock ledger routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stocks).post(handlers::create_stock))
        .route("/bulk-delete", post(handlers::bulk_delete_stocks))
        .route("/groups", get(handlers::list_groups))
        .route("/groups/members", get(handlers::group_members))
        .route("/import", post(handlers::import_stocks))
        .route("/import/csv", post(handlers::import_stocks_csv))
        .route("/export", get(handlers::export_stocks))
        .route(
            "/:stock_id",
            get(handlers::get_stock)
                .put(handlers::update_stock)
                .delete(handlers::delete_stock),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Milling batch routes (protected)
fn milling_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::start_batch))
        .route(
            "/:batch_id",
            get(handlers::get_batch).delete(handlers::delete_batch),
        )
        .route("/:batch_id/stocks", post(handlers::move_stock))
        .route("/:batch_id/packaging", put(handlers::set_packaging))
        .route("/:batch_id/close", post(handlers::close_batch))
        .route("/:batch_id/reopen", post(handlers::reopen_batch))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Release routes (protected)
fn release_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_releases).post(handlers::create_release))
        .route("/cancel", post(handlers::cancel_release))
        .route("/delete", post(handlers::delete_releases))
        .route("/items/:stock_id", delete(handlers::remove_release_item))
        .route(
            "/:release_id",
            get(handlers::get_release).put(handlers::update_release),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Reference data routes (protected)
fn reference_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/producers", get(handlers::list_producers))
        .route("/varieties", get(handlers::list_varieties))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
