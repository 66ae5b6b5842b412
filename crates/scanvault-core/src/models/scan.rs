use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::analysis::AnalysisReport;

/// Lifecycle state of a scan record.
///
/// ```text
/// PENDING  -> SCANNING | ERROR
/// SCANNING -> COMPLETED | ERROR
/// COMPLETED, ERROR: terminal
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "scan_status", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanStatus {
    Pending,
    Scanning,
    Completed,
    Error,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Error)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        match (self, next) {
            (ScanStatus::Pending, ScanStatus::Scanning) => true,
            (ScanStatus::Pending, ScanStatus::Error) => true,
            (ScanStatus::Scanning, ScanStatus::Completed) => true,
            (ScanStatus::Scanning, ScanStatus::Error) => true,
            (ScanStatus::Pending, _)
            | (ScanStatus::Scanning, _)
            | (ScanStatus::Completed, _)
            | (ScanStatus::Error, _) => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "PENDING",
            ScanStatus::Scanning => "SCANNING",
            ScanStatus::Completed => "COMPLETED",
            ScanStatus::Error => "ERROR",
        }
    }
}

impl Display for ScanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ScanStatus::Pending),
            "SCANNING" => Ok(ScanStatus::Scanning),
            "COMPLETED" => Ok(ScanStatus::Completed),
            "ERROR" => Ok(ScanStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid scan status: {}", s)),
        }
    }
}

/// One upload attempt and its scan state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ScanRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    /// Vendor analysis id; set once on successful submission.
    pub external_reference_id: Option<String>,
    pub status: ScanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File metadata captured at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub file_name: String,
    pub file_size: u64,
}

impl FileMeta {
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
        }
    }
}

/// A page of results plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        let total = self.total.max(0) as u64;
        total.div_ceil(self.per_page as u64) as u32
    }
}

/// Per-user dashboard counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ScanStats {
    pub total_scans: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub failed: i64,
    /// Scans that ended in ERROR, matching the dashboard's threat counter.
    pub threats_detected: i64,
    pub last_scan_at: Option<DateTime<Utc>>,
}

/// Record plus the vendor analysis when one could be fetched.
#[derive(Debug, Clone)]
pub struct ScanDetails {
    pub record: ScanRecord,
    pub analysis: Option<AnalysisReport>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub scan_id: Uuid,
    pub status: ScanStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanCheckResponse {
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanDetailsResponse {
    pub scan: ScanRecord,
    pub analysis: Option<AnalysisReport>,
}

impl From<ScanDetails> for ScanDetailsResponse {
    fn from(details: ScanDetails) -> Self {
        Self {
            scan: details.record,
            analysis: details.analysis,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub scans: Vec<ScanRecord>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
}

impl From<Page<ScanRecord>> for HistoryResponse {
    fn from(page: Page<ScanRecord>) -> Self {
        let pages = page.pages();
        Self {
            scans: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            pages,
        }
    }
}
