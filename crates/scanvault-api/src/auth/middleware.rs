use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use scanvault_core::AppError;
use std::sync::Arc;

use super::jwt::JwtValidator;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: JwtValidator,
}

/// Verify the bearer session token and attach the `SessionUser`.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match auth_state.jwt.validate_token(token.trim()) {
        Ok(session) => {
            tracing::debug!(subject = %session.subject, "Session verified");
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(err) => HttpAppError(err).into_response(),
    }
}
