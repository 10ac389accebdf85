//! Export configuration.
//!
//! [`ExportConfig`] is read once per run, either from a JSON file or built
//! from defaults, and then only borrowed. Keys use the exporter option names
//! (`mediaPath`, `mediaBookPath`, `useImageObjects`, ...) so existing option
//! files keep working.
//!
//! ```json
//! {
//!     "dataPath": "./out/data.json",
//!     "mediaPath": "./out/media/",
//!     "mediaBookPath": "media/",
//!     "useImageObjects": true,
//!     "source": { "kind": "directus", "baseUrl": "https://cms.example.com" }
//! }
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::attachment::AttachmentMatcher;
use crate::download::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::media::{FilenameStrategy, PathDeriver};
use crate::rewrite::{DEFAULT_MAX_NESTING_DEPTH, RewriteOptions};

/// Largest accepted nesting limit. The rewrite recurses once per level, and
/// this bound stays well inside a 2 MiB thread stack in unoptimized builds.
pub const MAX_NESTING_DEPTH_LIMIT: usize = 256;

/// Attachment host used by Fieldbook exports.
pub const FIELDBOOK_PATTERN: &str = r"https?://fieldbook\.com/attachments";

/// Attachment host used by Airtable exports.
pub const AIRTABLE_PATTERN: &str = r"https?://dl\.airtable\.com";

/// `meta.table` value of Directus file entities.
pub const DIRECTUS_FILE_TABLE: &str = "directus_files";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("could not read config file {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ExportConfig`].
    #[error("could not parse config file {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A host pattern does not compile.
    #[error("invalid attachment pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A value is outside its accepted range.
    #[error("invalid config value for `{field}`: {message}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Which upstream shape the exported document has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum SourceProfile {
    /// Fieldbook books: attachment URL strings on `fieldbook.com/attachments`.
    #[default]
    Fieldbook,
    /// Airtable bases: attachment URL strings on `dl.airtable.com`, with
    /// companion keys recording the original URL and filename.
    Airtable,
    /// Directus items: `directus_files` objects with relative URLs.
    Directus {
        /// Prefix for relative file URLs.
        #[serde(default)]
        base_url: String,
    },
    /// Any source storing attachments as URL strings.
    HostPattern {
        /// Regex searched for in string values.
        pattern: String,
        /// How filenames are derived from URLs.
        #[serde(default)]
        filename: FilenameStrategy,
        /// Add `$mediaUrl$` / `$mediaFilename$` companion keys.
        #[serde(default)]
        annotate_original_urls: bool,
    },
    /// Any source storing attachments as meta-tagged file objects.
    FileObject {
        /// `meta.table` value marking file entities.
        #[serde(default = "default_file_table")]
        file_table: String,
        /// Prefix for relative file URLs.
        #[serde(default)]
        base_url: String,
        /// Naming for files that carry no name of their own.
        #[serde(default)]
        filename: FilenameStrategy,
    },
}

fn default_file_table() -> String {
    DIRECTUS_FILE_TABLE.to_string()
}

impl SourceProfile {
    /// Builds the attachment matcher for this source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if a host pattern does not
    /// compile, or [`ConfigError::Invalid`] if it is empty.
    pub fn matcher(&self) -> Result<AttachmentMatcher, ConfigError> {
        match self {
            Self::Fieldbook => compile_pattern(FIELDBOOK_PATTERN),
            Self::Airtable => compile_pattern(AIRTABLE_PATTERN),
            Self::HostPattern { pattern, .. } => compile_pattern(pattern),
            Self::Directus { base_url } => Ok(AttachmentMatcher::file_object(
                DIRECTUS_FILE_TABLE,
                base_url.as_str(),
            )),
            Self::FileObject {
                file_table,
                base_url,
                ..
            } => Ok(AttachmentMatcher::file_object(
                file_table.as_str(),
                base_url.as_str(),
            )),
        }
    }

    /// Naming used when an attachment carries no filename.
    #[must_use]
    pub fn filename_strategy(&self) -> FilenameStrategy {
        match self {
            Self::Fieldbook | Self::Airtable => FilenameStrategy::LastTwoSegments,
            Self::Directus { .. } => FilenameStrategy::LastSegment,
            Self::HostPattern { filename, .. } | Self::FileObject { filename, .. } => *filename,
        }
    }

    /// Whether string attachments get companion keys.
    #[must_use]
    pub fn annotates_original_urls(&self) -> bool {
        match self {
            Self::Airtable => true,
            Self::HostPattern {
                annotate_original_urls,
                ..
            } => *annotate_original_urls,
            _ => false,
        }
    }
}

fn compile_pattern(pattern: &str) -> Result<AttachmentMatcher, ConfigError> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "source.pattern",
            message: "attachment pattern must not be empty".to_string(),
        });
    }
    Regex::new(pattern)
        .map(AttachmentMatcher::host_pattern)
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Settings for one export run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// Where the rewritten JSON document is written.
    pub data_path: PathBuf,
    /// Prefix for writing media and checking for existing files.
    #[serde(rename = "mediaPath", alias = "mediaDiskPath")]
    pub media_disk_path: String,
    /// Prefix substituted into the document.
    #[serde(rename = "mediaBookPath", alias = "mediaReferencePath")]
    pub media_reference_path: String,
    /// Skip media whose file already exists.
    pub skip_existing_files: bool,
    /// Pretty-print the output document.
    pub prettify_json: bool,
    /// Keep file objects and swap their URL instead of replacing them.
    #[serde(rename = "useImageObjects", alias = "returnFullObjects")]
    pub return_full_objects: bool,
    /// Deepest container nesting accepted in the input document.
    pub max_nesting_depth: usize,
    /// Maximum media fetches in flight.
    pub concurrency: usize,
    /// Upstream document shape.
    pub source: SourceProfile,
    /// Filename strategy overriding the one implied by `source`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<FilenameStrategy>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.json"),
            media_disk_path: "./media/".to_string(),
            media_reference_path: "media/".to_string(),
            skip_existing_files: true,
            prettify_json: false,
            return_full_objects: false,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
            source: SourceProfile::default(),
            filename: None,
        }
    }
}

impl ExportConfig {
    /// Loads and validates a JSON config file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                message: format!(
                    "{} is outside {MIN_CONCURRENCY}..={MAX_CONCURRENCY}",
                    self.concurrency
                ),
            });
        }
        if !(1..=MAX_NESTING_DEPTH_LIMIT).contains(&self.max_nesting_depth) {
            return Err(ConfigError::Invalid {
                field: "maxNestingDepth",
                message: format!(
                    "{} is outside 1..={MAX_NESTING_DEPTH_LIMIT}",
                    self.max_nesting_depth
                ),
            });
        }
        self.source.matcher().map(|_| ())
    }

    /// Rewrite switches for this run.
    #[must_use]
    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            return_full_objects: self.return_full_objects,
            annotate_original_urls: self.source.annotates_original_urls(),
            max_nesting_depth: self.max_nesting_depth,
        }
    }

    /// Naming for attachments without a name of their own: the explicit
    /// `filename` override, else the source's strategy.
    #[must_use]
    pub fn filename_strategy(&self) -> FilenameStrategy {
        self.filename.unwrap_or_else(|| self.source.filename_strategy())
    }

    /// Path deriver for this run's media layout.
    #[must_use]
    pub fn path_deriver(&self) -> PathDeriver {
        PathDeriver::new(
            self.media_disk_path.as_str(),
            self.media_reference_path.as_str(),
            self.filename_strategy(),
        )
    }
}
