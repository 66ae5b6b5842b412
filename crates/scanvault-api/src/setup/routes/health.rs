//! Health check handler.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub database: String,
}

/// Liveness plus a database ping.
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database =
        match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(&state.pool)).await {
            Ok(Ok(_)) => "healthy".to_string(),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Database health check failed");
                format!("unhealthy: {}", e)
            }
            Err(_) => {
                tracing::error!("Database health check timed out");
                "timeout".to_string()
            }
        };

    let healthy = database == "healthy";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            database,
        }),
    )
}
