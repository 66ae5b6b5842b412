//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use scanvault_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ScanVault API",
        version = "0.1.0",
        description = "Upload files for malware scanning and follow each scan from submission to verdict. All endpoints are versioned under /api/v1/."
    ),
    paths(
        // Scans
        handlers::scans::upload_scan,
        handlers::scans::list_scans,
        handlers::scans::get_scan,
        handlers::scans::check_scan,
        handlers::scans::get_scan_details,
        // Dashboard
        handlers::stats::get_stats,
        // Users
        handlers::users::upsert_me,
    ),
    components(
        schemas(
            models::ScanRecord,
            models::ScanStatus,
            models::UploadResponse,
            models::ScanCheckResponse,
            models::ScanDetailsResponse,
            models::HistoryResponse,
            models::ScanStats,
            models::AnalysisReport,
            models::DetectionStats,
            models::EngineResult,
            models::User,
            models::UpsertUserRequest,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "scans", description = "File upload and scan lifecycle"),
        (name = "stats", description = "Per-user scan counters"),
        (name = "users", description = "User registration from the verified session"),
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
