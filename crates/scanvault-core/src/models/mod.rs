pub mod analysis;
pub mod scan;
pub mod user;

pub use analysis::{AnalysisReport, DetectionStats, EngineResult, VendorOutcome};
pub use scan::{
    FileMeta, HistoryQuery, HistoryResponse, Page, ScanCheckResponse, ScanDetails,
    ScanDetailsResponse, ScanRecord, ScanStats, ScanStatus, UploadResponse,
};
pub use user::{UpsertUserRequest, User};
