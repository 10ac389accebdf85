//! Error types for the download module.
//!
//! [`DownloadError`] describes why a single media item could not be fetched
//! or written; it is recorded per item and never aborts a batch.
//! [`FetchError`] covers the failures that do abort a batch.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching one media item.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the media file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the url
// or path the source error lacks, so the constructors above are used instead.

/// Errors that abort a whole fetch batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Invalid concurrency value provided.
    #[error("invalid concurrency value {value}: must be between {min} and {max}")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
        /// Smallest accepted value.
        min: usize,
        /// Largest accepted value.
        max: usize,
    },

    /// Checking whether a media file exists failed for a reason other than
    /// the file being absent.
    #[error("could not check whether {path} exists: {source}")]
    ExistenceCheck {
        /// The path being checked.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,

    /// A fetch task panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl FetchError {
    /// Creates an existence-check error.
    pub fn existence_check(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ExistenceCheck {
            path: path.into(),
            source,
        }
    }
}
