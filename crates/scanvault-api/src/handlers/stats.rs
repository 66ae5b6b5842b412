use crate::auth::SessionUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use scanvault_core::models::ScanStats;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Scan counters for the caller", body = ScanStats),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "User not registered", body = ErrorResponse)
    )
)]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> Result<Json<ScanStats>, HttpAppError> {
    let user = state.scans.resolve_user(&session.email).await?;
    let stats = state.scans.stats(user.id).await?;
    Ok(Json(stats))
}
