//! Recursive mirror engine.
//!
//! The engine walks a remote directory tree one listing at a time. Within a
//! level, every file body is spawned as its own Tokio task gated by the
//! shared [`ConcurrencyLimiter`]; subdirectories are recursed into after the
//! level's files are dispatched, and the level's file tasks are joined before
//! the level returns.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use repo_mirror::download::{HttpClient, MirrorEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpClient::new()?);
//! let engine = MirrorEngine::new(client, 3)?;
//! let result = engine
//!     .download_tree("https://git.example.com/api/v1/repos/o/r/contents/", Path::new("temp"))
//!     .await?;
//! println!("mirrored {} files, {} failures", result.succeeded, result.failed.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Known limit
//!
//! Recursion depth equals the remote tree depth. Traversal futures are boxed
//! on the heap, so depth does not grow the call stack, but a pathological
//! upstream can still make the run arbitrarily long.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::client::Transport;
use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::error::{FailureKind, ListingError, TransportError, WriteError};
use super::limiter::ConcurrencyLimiter;
use super::listing::{DirectoryEntry, Listing, fetch_listing};
use super::observer::{RunObserver, TracingObserver};
use crate::config::Traversal;

/// Error type for engine setup and the fatal root-listing condition.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The local mirror root could not be created.
    #[error("cannot create mirror root: {0}")]
    CreateRoot(#[source] WriteError),

    /// The root listing could not be fetched or parsed; nothing was mirrored.
    #[error("root listing {url} failed: {source}")]
    RootListing {
        /// Root listing URL.
        url: String,
        /// Why the listing failed.
        #[source]
        source: ListingError,
    },

    /// Semaphore was closed unexpectedly.
    #[error("concurrency limiter closed unexpectedly")]
    LimiterClosed,
}

/// One entry that could not be mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Local path the entry would have been written to.
    pub path: PathBuf,
    /// Remote URL that was being fetched.
    pub url: String,
    /// Failure class.
    pub kind: FailureKind,
    /// Human-readable cause.
    pub reason: String,
}

/// Outcome of a mirror run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Number of files written.
    pub succeeded: usize,
    /// Local paths written by this run, sorted.
    pub written: Vec<PathBuf>,
    /// Every file or subtree that was not mirrored, in completion order.
    pub failed: Vec<FailureRecord>,
}

impl RunResult {
    /// Returns true when nothing failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the failure recorded for `path`, if any.
    #[must_use]
    pub fn failure_for(&self, path: &Path) -> Option<&FailureRecord> {
        self.failed.iter().find(|record| record.path == path)
    }
}

/// A leaf unit of work: one file body to fetch and write.
#[derive(Debug, Clone)]
struct DownloadTask {
    source_url: String,
    local_path: PathBuf,
}

#[derive(Debug)]
enum FileFailure {
    Transport(TransportError),
    Write(WriteError),
    Limiter(EngineError),
}

impl FileFailure {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Write(_) => FailureKind::Write,
            Self::Limiter(_) => FailureKind::Aborted,
        }
    }

    fn reason(&self) -> String {
        match self {
            Self::Transport(e) => e.to_string(),
            Self::Write(e) => e.to_string(),
            Self::Limiter(e) => e.to_string(),
        }
    }
}

/// Mirrors remote directory trees to local storage.
///
/// The engine owns the concurrency limiter and a handle to the shared
/// transport. One engine can run several trees; they then share the limit.
pub struct MirrorEngine {
    transport: Arc<dyn Transport>,
    limiter: ConcurrencyLimiter,
    observer: Arc<dyn RunObserver>,
    traversal: Traversal,
}

impl std::fmt::Debug for MirrorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorEngine")
            .field("limiter", &self.limiter)
            .field("traversal", &self.traversal)
            .finish_non_exhaustive()
    }
}

impl MirrorEngine {
    /// Creates an engine allowing `concurrency` simultaneous file downloads.
    ///
    /// Failures are reported through [`TracingObserver`] and subdirectories
    /// are traversed sequentially until configured otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    #[instrument(level = "debug", skip(transport))]
    pub fn new(transport: Arc<dyn Transport>, concurrency: usize) -> Result<Self, EngineError> {
        let limiter = ConcurrencyLimiter::new(concurrency)?;
        debug!(concurrency, "creating mirror engine");
        Ok(Self {
            transport,
            limiter,
            observer: Arc::new(TracingObserver),
            traversal: Traversal::default(),
        })
    }

    /// Replaces the run observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets how sibling subdirectories are traversed.
    #[must_use]
    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.limiter.limit()
    }

    /// Mirrors the tree listed at `root_url` into `local_root`.
    ///
    /// Individual file and subdirectory failures never abort the run; they
    /// are reported to the observer and collected in [`RunResult::failed`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CreateRoot`] if `local_root` cannot be created
    /// and [`EngineError::RootListing`] if the root listing fails. In both
    /// cases nothing was downloaded.
    #[instrument(skip(self), fields(local_root = %local_root.display()))]
    pub async fn download_tree(
        &self,
        root_url: &str,
        local_root: &Path,
    ) -> Result<RunResult, EngineError> {
        tokio::fs::create_dir_all(local_root)
            .await
            .map_err(|e| EngineError::CreateRoot(WriteError::new(local_root, e)))?;

        self.observer.directory_started(root_url, local_root);
        let listing = fetch_listing(self.transport.as_ref(), root_url)
            .await
            .map_err(|source| EngineError::RootListing {
                url: root_url.to_string(),
                source,
            })?;

        info!(
            entries = listing.entries.len(),
            concurrency = self.limiter.limit(),
            "starting mirror run"
        );

        let run = Arc::new(RunContext {
            transport: Arc::clone(&self.transport),
            limiter: self.limiter.clone(),
            observer: Arc::clone(&self.observer),
            traversal: self.traversal,
            written: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        });

        Arc::clone(&run)
            .mirror_listing(listing, local_root.to_path_buf())
            .await;

        let result = run.finish();
        info!(
            succeeded = result.succeeded,
            failed = result.failed.len(),
            "mirror run complete"
        );
        Ok(result)
    }
}

/// State shared by every task of one run.
///
/// Written paths and failures are the only shared mutable collections.
struct RunContext {
    transport: Arc<dyn Transport>,
    limiter: ConcurrencyLimiter,
    observer: Arc<dyn RunObserver>,
    traversal: Traversal,
    written: Mutex<Vec<PathBuf>>,
    failures: Mutex<Vec<FailureRecord>>,
}

impl RunContext {
    fn mirror_listing(self: Arc<Self>, listing: Listing, dir: PathBuf) -> BoxFuture<'static, ()> {
        async move {
            let (files, dirs) = listing.partition();

            // Fan out: every file of this level is spawned before anything is awaited.
            let mut downloads: Vec<(DownloadTask, JoinHandle<()>)> =
                Vec::with_capacity(files.len());
            for entry in files {
                let DirectoryEntry::File { name, download_url } = entry else {
                    continue;
                };
                let task = DownloadTask {
                    source_url: download_url,
                    local_path: dir.join(&name),
                };
                let handle = tokio::spawn(Arc::clone(&self).run_download(task.clone()));
                downloads.push((task, handle));
            }
            debug!(
                dir = %dir.display(),
                files = downloads.len(),
                subdirectories = dirs.len(),
                "dispatched level"
            );

            match self.traversal {
                Traversal::Sequential => {
                    for entry in dirs {
                        if let DirectoryEntry::Directory { name, listing_url } = entry {
                            Arc::clone(&self)
                                .mirror_directory(dir.join(&name), listing_url)
                                .await;
                        }
                    }
                }
                Traversal::Parallel => {
                    let mut subtrees = Vec::with_capacity(dirs.len());
                    for entry in dirs {
                        if let DirectoryEntry::Directory { name, listing_url } = entry {
                            let path = dir.join(&name);
                            let subtree = Arc::clone(&self)
                                .mirror_directory(path.clone(), listing_url.clone());
                            let handle = tokio::spawn(subtree);
                            subtrees.push((path, listing_url, handle));
                        }
                    }
                    for (path, listing_url, handle) in subtrees {
                        if let Err(e) = handle.await {
                            self.record_aborted(path, listing_url, &e);
                        }
                    }
                }
            }

            // Fan in.
            for (task, handle) in downloads {
                if let Err(e) = handle.await {
                    self.record_aborted(task.local_path, task.source_url, &e);
                }
            }
        }
        .boxed()
    }

    fn mirror_directory(
        self: Arc<Self>,
        path: PathBuf,
        listing_url: String,
    ) -> BoxFuture<'static, ()> {
        async move {
            self.observer.directory_started(&listing_url, &path);

            // The directory exists before any download under it is dispatched.
            if let Err(e) = tokio::fs::create_dir_all(&path).await {
                let error = WriteError::new(&path, e);
                self.record_failure(path, listing_url, FailureKind::Write, error.to_string());
                return;
            }

            match fetch_listing(self.transport.as_ref(), &listing_url).await {
                Ok(listing) => self.mirror_listing(listing, path).await,
                Err(e) => {
                    let kind = e.kind();
                    self.record_failure(path, listing_url, kind, e.to_string());
                }
            }
        }
        .boxed()
    }

    async fn run_download(self: Arc<Self>, task: DownloadTask) {
        let outcome = match self.limiter.acquire().await {
            Ok(permit) => {
                let outcome = self.fetch_and_write(&task).await;
                self.limiter.release(permit);
                outcome
            }
            Err(e) => Err(FileFailure::Limiter(e)),
        };

        match outcome {
            Ok(bytes) => {
                self.observer.file_completed(&task.local_path, bytes);
                self.written
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(task.local_path);
            }
            Err(failure) => {
                // A copy left by an earlier run must not pass for this one.
                remove_stale_file(&task.local_path).await;
                let kind = failure.kind();
                self.record_failure(task.local_path, task.source_url, kind, failure.reason());
            }
        }
    }

    async fn fetch_and_write(&self, task: &DownloadTask) -> Result<u64, FileFailure> {
        let body = self
            .transport
            .get(&task.source_url)
            .await
            .map_err(FileFailure::Transport)?;
        write_file(&task.local_path, &body)
            .await
            .map_err(FileFailure::Write)?;
        Ok(body.len() as u64)
    }

    fn record_failure(&self, path: PathBuf, url: String, kind: FailureKind, reason: String) {
        let record = FailureRecord {
            path,
            url,
            kind,
            reason,
        };
        self.observer.failure(&record);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    fn record_aborted(&self, path: PathBuf, url: String, error: &tokio::task::JoinError) {
        warn!(path = %path.display(), error = %error, "mirror task panicked");
        self.record_failure(path, url, FailureKind::Aborted, format!("task panic: {error}"));
    }

    fn finish(&self) -> RunResult {
        let mut written = std::mem::take(
            &mut *self
                .written
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        written.sort();
        let failed = std::mem::take(
            &mut *self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        RunResult {
            succeeded: written.len(),
            written,
            failed,
        }
    }
}

/// Removes a regular file at `path`, if one exists. Directories are left alone.
async fn remove_stale_file(path: &Path) {
    let Ok(metadata) = tokio::fs::symlink_metadata(path).await else {
        return;
    };
    if metadata.is_dir() {
        return;
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed stale file after failed download"),
        Err(e) => warn!(path = %path.display(), error = %e, "cannot remove stale file"),
    }
}

/// Writes `body` to `path`, truncating any existing file.
///
/// A partially written file is removed so it cannot reach the manifest.
async fn write_file(path: &Path, body: &[u8]) -> Result<(), WriteError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| WriteError::new(parent, e))?;
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| WriteError::new(path, e))?;

    let written = async {
        file.write_all(body).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        debug!(path = %path.display(), "cleaning up partial file after error");
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
        return Err(WriteError::new(path, e));
    }
    Ok(())
}
