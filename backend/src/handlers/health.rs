//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // Check database connectivity
    let (status, code, database) = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => ("healthy", StatusCode::OK, "connected"),
        Err(err) => {
            tracing::warn!(error = %err, "health check could not reach the database");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "disconnected")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
        }),
    )
}
