/// Route prefix for versioned endpoints.
pub const API_PREFIX: &str = "/api/v1";

/// Headroom on top of the upload limit for multipart framing, so slightly
/// oversized files still reach the size check and get a descriptive error.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Default server-wide concurrency limit.
pub const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 10_000;
