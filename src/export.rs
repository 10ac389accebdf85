//! End-to-end export: rewrite, fetch media, write JSON.
//!
//! [`Exporter`] ties the pieces together for one run. It never knows how the
//! input document was obtained; callers hand it an already-fetched
//! [`serde_json::Value`].
//!
//! The JSON document is written after every media item has resolved, even
//! when some of them failed. Failed items keep their local reference in the
//! document; they are logged and reported in [`ExportReport`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use tracing::{info, instrument};

use crate::attachment::AttachmentMatcher;
use crate::config::{ConfigError, ExportConfig};
use crate::download::{
    FetchError, FetchResult, FetchSummary, MediaFetcher, MediaSource, MediaStore,
};
use crate::media::PathDeriver;
use crate::rewrite::{DocumentRewriter, Rewrite, RewriteError};

/// Indent used for pretty-printed output.
const PRETTY_INDENT: &[u8] = b"    ";

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The document could not be rewritten.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// The media batch failed as a whole.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The rewritten document could not be serialized.
    #[error("could not serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The output file could not be written.
    #[error("could not write {path}: {source}")]
    Write {
        /// Output path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// What an export run produced.
#[derive(Debug)]
pub struct ExportReport {
    /// The rewritten document, as written to disk.
    pub document: Value,
    /// One result per unique media file.
    pub results: Vec<FetchResult>,
    /// Outcome counts of `results`.
    pub summary: FetchSummary,
    /// Where the document was written.
    pub data_path: PathBuf,
}

/// Runs exports for one configuration.
#[derive(Debug)]
pub struct Exporter {
    config: ExportConfig,
    matcher: AttachmentMatcher,
    deriver: PathDeriver,
    fetcher: MediaFetcher,
}

impl Exporter {
    /// Creates an exporter over the given transport and store.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Config`] if the configuration is invalid.
    pub fn new(
        config: ExportConfig,
        source: Arc<dyn MediaSource>,
        store: Arc<dyn MediaStore>,
    ) -> Result<Self, ExportError> {
        config.validate()?;
        let matcher = config.source.matcher()?;
        let deriver = config.path_deriver();
        let fetcher = MediaFetcher::new(
            source,
            store,
            config.concurrency,
            config.skip_existing_files,
        )?;
        Ok(Self {
            config,
            matcher,
            deriver,
            fetcher,
        })
    }

    /// Returns the configuration of this exporter.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Rewrites `document` without touching the network or disk.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError`] if the document nests too deeply.
    pub fn rewrite(&self, document: &Value) -> Result<Rewrite, RewriteError> {
        DocumentRewriter::new(&self.matcher, &self.deriver, self.config.rewrite_options())
            .rewrite(document)
    }

    /// Rewrites `document`, fetches its media, and writes the result to
    /// the configured data path.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] for rewrite, batch-level fetch, serialization
    /// or output failures. Individual media failures are reported in the
    /// returned [`ExportReport`] instead.
    #[instrument(skip(self, document), fields(data_path = %self.config.data_path.display()))]
    pub async fn run(&self, document: &Value) -> Result<ExportReport, ExportError> {
        let Rewrite { document, media } = self.rewrite(document)?;
        info!(attachments = media.len(), "document rewritten");

        let results = self.fetcher.fetch_all(&media).await?;
        let summary = FetchSummary::from_results(&results);

        let json = to_json(&document, self.config.prettify_json).map_err(ExportError::Serialize)?;
        write_output(&self.config.data_path, &json).await?;
        info!(path = %self.config.data_path.display(), "written JSON file");

        Ok(ExportReport {
            document,
            results,
            summary,
            data_path: self.config.data_path.clone(),
        })
    }
}

/// Serializes `document` compactly, or pretty-printed with a 4-space indent.
///
/// # Errors
///
/// Returns the serializer error, which for plain value trees does not occur
/// in practice.
pub fn to_json(document: &Value, pretty: bool) -> Result<String, serde_json::Error> {
    if !pretty {
        return serde_json::to_string(document);
    }
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(PRETTY_INDENT));
    document.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

async fn write_output(path: &Path, json: &str) -> Result<(), ExportError> {
    let write_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::write(path, json).await.map_err(write_err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_to_json_compact() {
        let document = json!({"a": [1, 2], "b": "c"});
        assert_eq!(to_json(&document, false).unwrap(), r#"{"a":[1,2],"b":"c"}"#);
    }

    #[test]
    fn test_to_json_pretty_uses_four_spaces() {
        let document = json!({"a": 1});
        assert_eq!(to_json(&document, true).unwrap(), "{\n    \"a\": 1\n}");
    }
}
