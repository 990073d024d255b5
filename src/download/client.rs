//! HTTP transport for listing and file requests.
//!
//! [`HttpClient`] wraps one pooled `reqwest::Client` for the whole run, so
//! the number of open sockets stays bounded no matter how large the remote
//! tree is. The orchestrator only sees the [`Transport`] trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, MAX_ERROR_BODY_CHARS, REQUEST_TIMEOUT_SECS};
use super::error::TransportError;
use crate::config::{MirrorConfig, TlsVerification};
use crate::user_agent;

/// Fetches raw bodies and JSON documents.
///
/// Implementations must turn every failure (status, network, timeout) into
/// a [`TransportError`] value.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the full response body of `url`.
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// Fetches `url` and decodes the body as JSON.
    ///
    /// Non-success responses carry the body text for diagnostics.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, TransportError>;
}

/// Transport settings taken from [`MirrorConfig`].
#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// TLS certificate policy.
    pub tls: TlsVerification,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            tls: TlsVerification::Verify,
        }
    }
}

impl From<&MirrorConfig> for TransportSettings {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            tls: config.tls,
        }
    }
}

/// reqwest-backed [`Transport`] sharing one connection pool.
///
/// Cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with default timeouts and TLS verification on.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the TLS backend fails to initialise.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_settings(TransportSettings::default())
    }

    /// Creates a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the TLS backend fails to initialise.
    #[instrument(level = "debug")]
    pub fn with_settings(settings: TransportSettings) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent());

        if settings.tls.is_insecure() {
            warn!("TLS certificate verification is disabled for this run");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|source| TransportError::Build { source })?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        Url::parse(url).map_err(|_| TransportError::invalid_url(url))?;
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.send(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        debug!(bytes = body.len(), "fetched body");
        Ok(body.to_vec())
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, TransportError> {
        let response = self.send(url).await?;
        let status = response.status();
        if !status.is_success() {
            // Body text is diagnostic only; a failed read leaves it empty.
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::http_status_with_body(
                url,
                status.as_u16(),
                truncate_body(body),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        serde_json::from_slice(&bytes).map_err(|source| TransportError::InvalidJson {
            url: url.to_string(),
            source,
        })
    }
}

fn truncate_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}
