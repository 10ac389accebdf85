//! HTTP transport for media files.
//!
//! [`HttpClient`] is the production [`MediaSource`]: one GET per call, no
//! retries, body streamed into memory chunk by chunk.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Fetches the bytes behind a remote media URL.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetches `url` once.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] describing the transport failure.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// HTTP client for fetching media.
///
/// This client is designed to be created once and reused for every item of a
/// batch, taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use media_export::download::{HttpClient, MediaSource};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let bytes = client.fetch("https://example.com/photo.png").await?;
/// println!("fetched {} bytes", bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the client cannot be built.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl MediaSource for HttpClient {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.send_request(url).await?;
        let capacity = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);

        let mut body = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url)
                } else {
                    DownloadError::network(url, e)
                }
            })?;
            body.extend_from_slice(&chunk);
        }

        debug!(bytes = body.len(), "media fetched");
        Ok(body)
    }
}
