//! Central configuration constants for runtime limits and defaults.

/// Default per-request timeout against the course API, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of concurrent uploads within one wizard step.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Minimum allowed concurrent uploads.
pub const MIN_UPLOAD_CONCURRENCY: usize = 1;

/// Maximum allowed concurrent uploads.
pub const MAX_UPLOAD_CONCURRENCY: usize = 8;

/// Base URL used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// File name of the local draft database.
pub const DRAFTS_DB_FILENAME: &str = "academy.redb";

/// Multipart field carrying the JSON part of a form submission.
pub const MULTIPART_DATA_FIELD: &str = "data";

/// Multipart field carrying the binary part of an upload.
pub const MULTIPART_FILE_FIELD: &str = "file";

/// Convenience function to clamp an upload concurrency value into allowed range.
pub fn clamp_upload_concurrency(v: usize) -> usize {
    v.clamp(MIN_UPLOAD_CONCURRENCY, MAX_UPLOAD_CONCURRENCY)
}
