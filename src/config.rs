//! Run configuration for a mirror pass.
//!
//! Everything the original tool hard-coded (listing URL, output folder,
//! manifest file, concurrency) is a field here. TLS verification is an
//! explicit [`TlsVerification`] value rather than an implicit client default.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY,
    REQUEST_TIMEOUT_SECS,
};

/// Default manifest file name.
pub const DEFAULT_MANIFEST_PATH: &str = "hashes.csv";

/// Largest accepted timeout, in seconds.
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Whether the transport verifies the server's TLS certificate chain.
///
/// [`TlsVerification::AcceptInvalidCerts`] disables peer and hostname
/// verification entirely. Only use it against an upstream you already trust
/// (for example a self-hosted forge with a private CA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVerification {
    /// Verify certificates against the system roots.
    #[default]
    Verify,
    /// Accept any certificate. Insecure.
    AcceptInvalidCerts,
}

impl TlsVerification {
    /// Returns true when certificate checks are disabled.
    #[must_use]
    pub fn is_insecure(self) -> bool {
        matches!(self, Self::AcceptInvalidCerts)
    }
}

/// How sibling subdirectories are traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    /// One subdirectory at a time, in listing order.
    #[default]
    Sequential,
    /// All subdirectories of a level concurrently.
    Parallel,
}

/// Errors from [`MirrorConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Root listing URL is not an absolute http(s) URL.
    #[error("invalid root listing URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Concurrency outside the accepted range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// Timeout outside the accepted range.
    #[error("invalid {field}: {secs}s, expected 1..={MAX_TIMEOUT_SECS} seconds")]
    InvalidTimeout {
        /// Which timeout was rejected.
        field: &'static str,
        /// The rejected value in seconds.
        secs: u64,
    },
}

/// Settings for one mirror run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Listing URL of the remote root directory.
    pub root_url: String,
    /// Local directory the remote tree is mirrored into.
    pub output_dir: PathBuf,
    /// Where the integrity manifest is written.
    pub manifest_path: PathBuf,
    /// Maximum simultaneous file-body downloads.
    pub concurrency: usize,
    /// TLS certificate policy.
    pub tls: TlsVerification,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout, applied to listings and file bodies alike.
    pub request_timeout: Duration,
    /// Sibling subdirectory traversal order.
    pub traversal: Traversal,
}

impl MirrorConfig {
    /// Creates a config with default concurrency, timeouts, and TLS verification on.
    pub fn new(root_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_url: root_url.into(),
            output_dir: output_dir.into(),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            concurrency: DEFAULT_CONCURRENCY,
            tls: TlsVerification::default(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            traversal: Traversal::default(),
        }
    }

    /// Sets the manifest output path.
    #[must_use]
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Sets the download concurrency limit.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the TLS certificate policy.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the subdirectory traversal order.
    #[must_use]
    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Checks the URL, concurrency, and timeouts.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.root_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.root_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.root_url.clone(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::InvalidConcurrency {
                value: self.concurrency,
            });
        }

        validate_timeout("connect timeout", self.connect_timeout)?;
        validate_timeout("request timeout", self.request_timeout)?;
        Ok(())
    }
}

fn validate_timeout(field: &'static str, timeout: Duration) -> Result<(), ConfigError> {
    let secs = timeout.as_secs();
    if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
        return Err(ConfigError::InvalidTimeout { field, secs });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const URL: &str = "https://git.example.com/api/v1/repos/org/repo/contents/";

    #[test]
    fn test_new_uses_conservative_defaults() {
        let config = MirrorConfig::new(URL, "temp");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.tls, TlsVerification::Verify);
        assert!(!config.tls.is_insecure());
        assert_eq!(config.traversal, Traversal::Sequential);
        assert_eq!(config.manifest_path, PathBuf::from("hashes.csv"));
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_insecure_tls_is_opt_in() {
        let config = MirrorConfig::new(URL, "temp").with_tls(TlsVerification::AcceptInvalidCerts);
        assert!(config.tls.is_insecure());
    }

    #[test]
    fn test_validate_rejects_relative_url() {
        let err = MirrorConfig::new("api/contents", "temp")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let err = MirrorConfig::new("ftp://example.com/contents", "temp")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("ftp"), "got: {err}");
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let err = MirrorConfig::new(URL, "temp")
            .with_concurrency(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConcurrency { value: 0 }));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let err = MirrorConfig::new(URL, "temp")
            .with_request_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidTimeout {
                field: "request timeout",
                secs: 0
            }
        ));
    }
}
