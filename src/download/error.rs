//! Error types for the download module.
//!
//! Each failure class a mirror run can hit has its own enum so the
//! orchestrator can decide how far a failure propagates: transport and write
//! failures stay with one file, listing failures stay with one subtree.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the HTTP transport.
///
/// Non-success statuses and network faults are both values of this type;
/// neither is allowed to escape the transport as a panic or an untyped error.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Build {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The provided URL is malformed or not absolute.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Network-level error (DNS resolution, connection refused, reset, TLS).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}{}", body_suffix(.body.as_deref()))]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Response body text, captured for listing fetches only.
        body: Option<String>,
    },

    /// A listing response body was not valid JSON.
    #[error("invalid JSON from {url}: {source}")]
    InvalidJson {
        /// The listing URL.
        url: String,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },
}

fn body_suffix(body: Option<&str>) -> String {
    match body {
        Some(text) if !text.is_empty() => format!(" - {text}"),
        _ => String::new(),
    }
}

impl TransportError {
    /// Creates a network error, promoting reqwest timeouts to [`TransportError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error without body text.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            body: None,
        }
    }

    /// Creates an HTTP status error carrying response body text.
    pub fn http_status_with_body(url: impl Into<String>, status: u16, body: String) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            body: Some(body),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the HTTP status code, if this is a status failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures fetching or validating one directory listing.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The listing could not be fetched.
    #[error(transparent)]
    Transport(TransportError),

    /// The listing body was fetched but does not describe a directory.
    #[error("malformed listing from {url}: {reason}")]
    Malformed {
        /// The listing URL.
        url: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ListingError {
    /// Creates a malformed-listing error.
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns the failure class for run reporting.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(TransportError::InvalidJson { .. }) | Self::Malformed { .. } => {
                FailureKind::ListingParse
            }
            Self::Transport(_) => FailureKind::Transport,
        }
    }
}

impl From<TransportError> for ListingError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::InvalidJson { url, source } => Self::Malformed {
                url,
                reason: source.to_string(),
            },
            other => Self::Transport(other),
        }
    }
}

/// Local filesystem failure while creating a directory or writing a file.
#[derive(Debug, Error)]
#[error("IO error writing to {path}: {source}")]
pub struct WriteError {
    /// The path being created or written.
    pub path: PathBuf,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    /// Creates a write error for `path`.
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Failure class recorded for each entry that could not be mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Non-success status or network fault.
    Transport,
    /// Listing body was not a valid directory listing.
    ListingParse,
    /// Local directory or file could not be written.
    Write,
    /// The unit of work panicked or lost its permit before finishing.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Transport => "transport",
            Self::ListingParse => "listing_parse",
            Self::Write => "write",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

// No blanket `From<reqwest::Error>` or `From<std::io::Error>`: every variant
// needs the URL or path the source error does not carry.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_includes_body() {
        let error = TransportError::http_status_with_body(
            "https://example.com/api/contents/",
            404,
            "{\"message\":\"not found\"}".to_string(),
        );
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/api/contents/"));
        assert!(msg.contains("not found"), "Expected body in: {msg}");
    }

    #[test]
    fn test_http_status_display_without_body() {
        let error = TransportError::http_status("https://example.com/a.txt", 500);
        assert_eq!(
            error.to_string(),
            "HTTP 500 fetching https://example.com/a.txt"
        );
        assert_eq!(error.status(), Some(500));
    }

    #[test]
    fn test_timeout_display() {
        let error = TransportError::Timeout {
            url: "https://example.com/slow".to_string(),
        };
        assert!(error.to_string().contains("timeout"));
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_invalid_json_converts_to_malformed_listing() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = ListingError::from(TransportError::InvalidJson {
            url: "https://example.com/dir".to_string(),
            source,
        });
        assert!(matches!(error, ListingError::Malformed { .. }));
        assert_eq!(error.kind(), FailureKind::ListingParse);
    }

    #[test]
    fn test_status_failure_stays_transport_kind() {
        let error = ListingError::from(TransportError::http_status("https://example.com/dir", 503));
        assert_eq!(error.kind(), FailureKind::Transport);
        assert!(error.to_string().contains("503"));
    }

    #[test]
    fn test_write_error_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = WriteError::new("/tmp/mirror/a.txt", io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/mirror/a.txt"), "Expected path in: {msg}");
    }

    #[test]
    fn test_failure_kind_labels() {
        assert_eq!(FailureKind::Transport.to_string(), "transport");
        assert_eq!(FailureKind::ListingParse.to_string(), "listing_parse");
        assert_eq!(FailureKind::Write.to_string(), "write");
        assert_eq!(FailureKind::Aborted.to_string(), "aborted");
    }
}
