//! Media download engine.
//!
//! This module fetches the media discovered by a rewrite pass and writes it
//! under the configured media directory.
//!
//! # Features
//!
//! - Deduplication by local disk path (the same file is fetched once)
//! - Skipping of files that already exist, for cheap re-runs
//! - Bounded concurrency with per-item failure isolation
//! - Pluggable transport ([`MediaSource`]) and storage ([`MediaStore`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use media_export::download::{HttpClient, LocalDisk, MediaFetcher};
//! use media_export::media::{FilenameStrategy, PathDeriver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let deriver = PathDeriver::new("./media/", "media/", FilenameStrategy::LastTwoSegments);
//! let descriptor = deriver.derive("https://example.com/x/photo.png", None);
//!
//! let fetcher = MediaFetcher::new(Arc::new(HttpClient::new()?), Arc::new(LocalDisk), 10, true)?;
//! let results = fetcher.fetch_all(&[descriptor]).await?;
//! println!("processed {} items", results.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod fetcher;
mod store;

pub use client::{HttpClient, MediaSource};
pub use constants::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};
pub use error::{DownloadError, FetchError};
pub use fetcher::{
    FetchOutcome, FetchResult, FetchSummary, MediaFetcher, dedup_by_disk_path,
};
pub use store::{LocalDisk, MediaStore};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
