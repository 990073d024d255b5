//! Constants for the download module (timeouts, concurrency bounds).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout (5 minutes for large files).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default number of simultaneous file-body downloads.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Upper bound on error body text kept for diagnostics.
pub const MAX_ERROR_BODY_CHARS: usize = 512;
