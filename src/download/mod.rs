//! Remote tree download: transport, listings, admission control, orchestration.
//!
//! # Features
//!
//! - One pooled HTTP client per run (bounded socket usage)
//! - Typed listing entries validated at the parse boundary
//! - File-body downloads gated by a counting permit (default 3)
//! - Partial-failure tolerance: a failed file or subtree never cancels siblings
//! - Explicit TLS verification switch
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use repo_mirror::download::{HttpClient, MirrorEngine, fetch_listing};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpClient::new()?);
//! let listing = fetch_listing(client.as_ref(), "https://git.example.com/api/contents/").await?;
//! println!("{} entries", listing.entries.len());
//!
//! let engine = MirrorEngine::new(client, 3)?;
//! engine
//!     .download_tree("https://git.example.com/api/contents/", Path::new("temp"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod limiter;
mod listing;
mod observer;

pub use client::{HttpClient, Transport, TransportSettings};
pub use constants::DEFAULT_CONCURRENCY;
pub use engine::{EngineError, FailureRecord, MirrorEngine, RunResult};
pub use error::{FailureKind, ListingError, TransportError, WriteError};
pub use limiter::{ConcurrencyLimiter, Permit};
pub use listing::{DirectoryEntry, Listing, fetch_listing, parse_listing};
pub use observer::{RunObserver, TracingObserver};

// Note: no module-local Result aliases. Use `Result<T, TransportError>` etc.
// explicitly in function signatures.
