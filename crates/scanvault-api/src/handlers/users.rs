use crate::auth::SessionUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use scanvault_core::models::{UpsertUserRequest, User};
use std::sync::Arc;
use validator::Validate;

/// Register the caller on first login, or update their display name.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "users",
    request_body = UpsertUserRequest,
    responses(
        (status = 200, description = "User record", body = User),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    )
)]
pub async fn upsert_me(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    ValidatedJson(request): ValidatedJson<UpsertUserRequest>,
) -> Result<Json<User>, HttpAppError> {
    request.validate()?;

    // Fall back to the name carried by the session token.
    let name = request.name.or(session.name);
    let user = state
        .scans
        .register_user(&session.email, name.as_deref())
        .await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(Json(user))
}
