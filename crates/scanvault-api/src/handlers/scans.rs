use crate::auth::SessionUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{extract_multipart_file, sanitize_filename};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use scanvault_core::models::{
    FileMeta, HistoryQuery, HistoryResponse, ScanCheckResponse, ScanDetailsResponse, ScanRecord,
    UploadResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub external_reference_id: Option<String>,
}

/// Upload a file and submit it for scanning.
#[utoipa::path(
    post,
    path = "/api/v1/scans",
    tag = "scans",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File submitted for scanning", body = UploadResponse),
        (status = 400, description = "No file provided", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 502, description = "Scanning service failed", body = ErrorResponse)
    )
)]
pub async fn upload_scan(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), HttpAppError> {
    let file = extract_multipart_file(multipart).await?;
    let file_name = sanitize_filename(&file.file_name)?;
    let user = state.scans.resolve_user(&session.email).await?;

    let meta = FileMeta::new(file_name, file.data.len() as u64);
    let record = state.scans.upload(user.id, meta, file.data).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            scan_id: record.id,
            status: record.status,
        }),
    ))
}

/// The caller's scan history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/scans",
    tag = "scans",
    params(
        ("page" = Option<u32>, Query, description = "1-based page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 10, max 100)")
    ),
    responses(
        (status = 200, description = "Paginated scan history", body = HistoryResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn list_scans(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, HttpAppError> {
    let user = state.scans.resolve_user(&session.email).await?;
    let page = state
        .scans
        .history(user.id, query.page, query.per_page)
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/scans/{id}",
    tag = "scans",
    params(("id" = Uuid, Path, description = "Scan ID")),
    responses(
        (status = 200, description = "Scan record", body = ScanRecord),
        (status = 404, description = "Scan not found", body = ErrorResponse)
    )
)]
pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanRecord>, HttpAppError> {
    let user = state.scans.resolve_user(&session.email).await?;
    let record = state.scans.find_owned(id, user.id).await?;
    Ok(Json(record))
}

/// Reconcile a scan with the vendor and return its current status.
#[utoipa::path(
    get,
    path = "/api/v1/scans/{id}/check",
    tag = "scans",
    params(
        ("id" = Uuid, Path, description = "Scan ID"),
        ("external_reference_id" = Option<String>, Query, description = "Expected vendor analysis id")
    ),
    responses(
        (status = 200, description = "Current scan status", body = ScanCheckResponse),
        (status = 400, description = "Reference does not match", body = ErrorResponse),
        (status = 404, description = "Scan not found", body = ErrorResponse),
        (status = 502, description = "Analysis lookup failed; scan is now ERROR", body = ErrorResponse)
    )
)]
pub async fn check_scan(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<Uuid>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<ScanCheckResponse>, HttpAppError> {
    let user = state.scans.resolve_user(&session.email).await?;
    let reconciled = state
        .scans
        .check(id, user.id, query.external_reference_id.as_deref())
        .await?;

    Ok(Json(ScanCheckResponse {
        status: reconciled.record.status,
        analysis: reconciled.analysis,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/scans/{id}/details",
    tag = "scans",
    params(("id" = Uuid, Path, description = "Scan ID")),
    responses(
        (status = 200, description = "Scan record with vendor analysis when available", body = ScanDetailsResponse),
        (status = 404, description = "Scan not found", body = ErrorResponse)
    )
)]
pub async fn get_scan_details(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanDetailsResponse>, HttpAppError> {
    let user = state.scans.resolve_user(&session.email).await?;
    let details = state.scans.details(id, user.id).await?;
    Ok(Json(details.into()))
}
