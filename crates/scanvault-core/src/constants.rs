//! Shared constants.

/// Maximum accepted upload size (5 MiB) unless `MAX_UPLOAD_SIZE_BYTES` overrides it.
pub const DEFAULT_MAX_UPLOAD_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of records per history page.
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 10;

/// Upper bound on `per_page` accepted by the history endpoint.
pub const MAX_HISTORY_PAGE_SIZE: u32 = 100;

/// Default VirusTotal v3 API base URL.
pub const DEFAULT_VIRUSTOTAL_API_URL: &str = "https://www.virustotal.com/api/v3";

/// Vendor analysis status that marks a finished scan.
pub const VENDOR_STATUS_COMPLETED: &str = "completed";

/// Interval between status checks used by polling clients.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
