//! Concurrent, deduplicated media fetching.
//!
//! [`MediaFetcher`] takes the descriptors collected by a rewrite pass,
//! drops duplicates (same local disk path), and fetches every remaining item
//! in its own Tokio task, bounded by a semaphore.
//!
//! # Outcomes
//!
//! Each unique descriptor resolves to exactly one [`FetchOutcome`]:
//! - [`FetchOutcome::Skipped`] - the file already exists and skipping is on
//! - [`FetchOutcome::Downloaded`] - fetched once and written to disk
//! - [`FetchOutcome::Failed`] - transport or write failure for that item only
//!
//! A failed item never cancels its siblings. The only batch-level failures
//! are the ones in [`FetchError`], most notably an existence check that fails
//! for a reason other than the file being absent.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::client::MediaSource;
use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::error::{DownloadError, FetchError};
use super::store::MediaStore;
use crate::media::MediaDescriptor;

/// How one media item was resolved.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A file already existed at the disk path; nothing was fetched.
    Skipped,
    /// The item was fetched and written.
    Downloaded {
        /// Number of bytes written.
        bytes: u64,
    },
    /// The item could not be fetched or written.
    Failed(DownloadError),
}

/// Outcome of one unique descriptor.
#[derive(Debug)]
pub struct FetchResult {
    /// The descriptor that was processed.
    pub descriptor: MediaDescriptor,
    /// What happened to it.
    pub outcome: FetchOutcome,
}

impl FetchResult {
    /// Returns `true` if the item failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Failed(_))
    }
}

/// Counts of a fetch batch by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Items fetched and written.
    pub downloaded: usize,
    /// Items skipped because they already existed.
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
}

impl FetchSummary {
    /// Tallies `results` by outcome.
    #[must_use]
    pub fn from_results(results: &[FetchResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut summary, result| {
                match result.outcome {
                    FetchOutcome::Skipped => summary.skipped += 1,
                    FetchOutcome::Downloaded { .. } => summary.downloaded += 1,
                    FetchOutcome::Failed(_) => summary.failed += 1,
                }
                summary
            })
    }

    /// Returns the number of items processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}

/// Removes descriptors whose disk path was already seen, keeping the first
/// occurrence and the original order.
#[must_use]
pub fn dedup_by_disk_path(descriptors: &[MediaDescriptor]) -> Vec<MediaDescriptor> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    descriptors
        .iter()
        .filter(|d| seen.insert(d.local_disk_path.as_str()))
        .cloned()
        .collect()
}

/// Fetches media descriptors to disk with bounded concurrency.
///
/// # Concurrency Model
///
/// - Every unique descriptor gets its own Tokio task
/// - A task holds a semaphore permit while it checks, fetches and writes
/// - Permits are released automatically when the task ends (RAII)
/// - [`MediaFetcher::fetch_all`] returns only after every task has finished
pub struct MediaFetcher {
    source: Arc<dyn MediaSource>,
    store: Arc<dyn MediaStore>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    skip_existing_files: bool,
}

impl std::fmt::Debug for MediaFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFetcher")
            .field("concurrency", &self.concurrency)
            .field("skip_existing_files", &self.skip_existing_files)
            .finish_non_exhaustive()
    }
}

impl MediaFetcher {
    /// Creates a fetcher over the given transport and store.
    ///
    /// # Arguments
    ///
    /// * `source` - Transport used for every remote fetch
    /// * `store` - Existence checks and writes
    /// * `concurrency` - Maximum number of items in flight (1-100)
    /// * `skip_existing_files` - Skip items whose disk path already exists
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidConcurrency`] if `concurrency` is outside
    /// the valid range (1-100).
    pub fn new(
        source: Arc<dyn MediaSource>,
        store: Arc<dyn MediaStore>,
        concurrency: usize,
        skip_existing_files: bool,
    ) -> Result<Self, FetchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(FetchError::InvalidConcurrency {
                value: concurrency,
                min: MIN_CONCURRENCY,
                max: MAX_CONCURRENCY,
            });
        }

        debug!(concurrency, skip_existing_files, "creating media fetcher");

        Ok(Self {
            source,
            store,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            skip_existing_files,
        })
    }

    /// Fetches every unique descriptor and returns one result per unique
    /// disk path, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ExistenceCheck`] as soon as an existence check
    /// fails for a reason other than absence; remaining tasks are aborted.
    /// Returns [`FetchError::Join`] if a task panics.
    ///
    /// Individual fetch or write failures do NOT cause this method to error;
    /// they are reported as [`FetchOutcome::Failed`].
    #[instrument(skip(self, descriptors), fields(descriptors = descriptors.len()))]
    pub async fn fetch_all(
        &self,
        descriptors: &[MediaDescriptor],
    ) -> Result<Vec<FetchResult>, FetchError> {
        let unique = dedup_by_disk_path(descriptors);
        info!(unique = unique.len(), "going to fetch media");

        let mut tasks = JoinSet::new();
        for (index, descriptor) in unique.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);
            let skip_existing_files = self.skip_existing_files;

            tasks.spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| FetchError::SemaphoreClosed)?;
                let outcome =
                    fetch_one(&*source, &*store, &descriptor, skip_existing_files).await?;
                Ok::<_, FetchError>((index, FetchResult { descriptor, outcome }))
            });
        }

        let mut slots: Vec<Option<FetchResult>> = unique.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined??;
            log_outcome(&result);
            slots[index] = Some(result);
        }

        let results: Vec<FetchResult> = slots.into_iter().flatten().collect();
        let summary = FetchSummary::from_results(&results);
        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "media fetch complete"
        );
        Ok(results)
    }
}

async fn fetch_one(
    source: &dyn MediaSource,
    store: &dyn MediaStore,
    descriptor: &MediaDescriptor,
    skip_existing_files: bool,
) -> Result<FetchOutcome, FetchError> {
    let path = descriptor.disk_path();

    if skip_existing_files
        && store
            .exists(path)
            .await
            .map_err(|e| FetchError::existence_check(path, e))?
    {
        return Ok(FetchOutcome::Skipped);
    }

    debug!(url = %descriptor.external_url, "fetching media");
    let bytes = match source.fetch(&descriptor.external_url).await {
        Ok(bytes) => bytes,
        Err(e) => return Ok(FetchOutcome::Failed(e)),
    };

    if let Err(e) = store.write(path, &bytes).await {
        return Ok(FetchOutcome::Failed(DownloadError::io(path, e)));
    }

    Ok(FetchOutcome::Downloaded {
        bytes: bytes.len() as u64,
    })
}

fn log_outcome(result: &FetchResult) {
    let descriptor = &result.descriptor;
    match &result.outcome {
        FetchOutcome::Skipped => {
            info!(filename = %descriptor.filename, "skipping media, file exists");
        }
        FetchOutcome::Downloaded { bytes } => {
            info!(url = %descriptor.external_url, path = %descriptor.local_disk_path, bytes, "media downloaded");
        }
        FetchOutcome::Failed(error) => {
            warn!(
                url = %descriptor.external_url,
                path = %descriptor.local_disk_path,
                error = %error,
                "media download failed"
            );
        }
    }
}
