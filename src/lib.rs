//! Repository Mirror Library
//!
//! This library mirrors a remote repository's file tree to local storage via
//! a paginated tree-listing HTTP API (Gitea/GitHub style `contents` endpoints)
//! and then produces an integrity manifest mapping each downloaded file to
//! its SHA-256 digest.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Run configuration, including the explicit TLS switch
//! - [`download`] - Transport, listing fetcher, concurrency limiter, and the
//!   recursive mirror engine
//! - [`manifest`] - Post-run digest pass and manifest file writer

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod manifest;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, MirrorConfig, TlsVerification, Traversal};
pub use download::{
    DEFAULT_CONCURRENCY, DirectoryEntry, EngineError, FailureKind, FailureRecord, HttpClient,
    Listing, ListingError, MirrorEngine, RunObserver, RunResult, Transport, TransportError,
    TransportSettings,
};
pub use manifest::{Manifest, ManifestError};
