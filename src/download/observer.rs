//! Run event reporting.
//!
//! The orchestrator never logs failures directly; it hands them to a
//! [`RunObserver`]. Production runs use [`TracingObserver`]. Tests inject
//! their own observer and assert on the events it saw.

use std::path::Path;

use tracing::{debug, error};

use super::engine::FailureRecord;

/// Receives progress and failure events from a mirror run.
///
/// Methods are called from concurrent download tasks and must not block.
pub trait RunObserver: Send + Sync {
    /// A directory's listing is about to be fetched into `path`.
    fn directory_started(&self, listing_url: &str, path: &Path) {
        let _ = (listing_url, path);
    }

    /// A file body was written to `path`.
    fn file_completed(&self, path: &Path, bytes: u64) {
        let _ = (path, bytes);
    }

    /// An entry could not be mirrored.
    fn failure(&self, record: &FailureRecord);
}

/// Reports events through `tracing`; failures at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn directory_started(&self, listing_url: &str, path: &Path) {
        debug!(url = %listing_url, path = %path.display(), "mirroring directory");
    }

    fn file_completed(&self, path: &Path, bytes: u64) {
        debug!(path = %path.display(), bytes, "file written");
    }

    fn failure(&self, record: &FailureRecord) {
        error!(
            url = %record.url,
            path = %record.path.display(),
            kind = %record.kind,
            reason = %record.reason,
            "failed to mirror entry"
        );
    }
}
