//! Media Export Library
//!
//! This library turns exported CMS / spreadsheet records (Fieldbook,
//! Airtable, Directus) into a self-contained JSON document: remote attachment
//! references are rewritten to local paths and the referenced media is
//! mirrored to disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`attachment`] - Recognizing attachment references per source shape
//! - [`media`] - Filename derivation and local path construction
//! - [`rewrite`] - Recursive, pure document rewriting
//! - [`download`] - Deduplicated, concurrent media fetching
//! - [`config`] - Run configuration and source presets
//! - [`export`] - The rewrite, fetch, write pipeline

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attachment;
pub mod config;
pub mod download;
pub mod export;
pub mod media;
pub mod rewrite;

mod user_agent;

// Re-export commonly used types
pub use attachment::{Attachment, AttachmentMatcher};
pub use config::{ConfigError, ExportConfig, SourceProfile};
pub use download::{
    DEFAULT_CONCURRENCY, DownloadError, FetchError, FetchOutcome, FetchResult, FetchSummary,
    HttpClient, LocalDisk, MediaFetcher, MediaSource, MediaStore,
};
pub use export::{ExportError, ExportReport, Exporter};
pub use media::{FilenameStrategy, MediaDescriptor, PathDeriver};
pub use rewrite::{DocumentRewriter, Rewrite, RewriteError, RewriteOptions};
