//! Filename derivation and local path construction for attachments.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Number of hex characters kept from the URL digest.
const FINGERPRINT_HEX_LEN: usize = 16;

/// Longest extension (including the dot) carried over onto a fingerprint name.
const MAX_EXTENSION_LEN: usize = 12;

/// The resolved local locations for one remote attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaDescriptor {
    /// Remote URL the media is fetched from.
    pub external_url: String,
    /// Filename under both media prefixes.
    pub filename: String,
    /// Where the file is written and checked for existence.
    pub local_disk_path: String,
    /// What the document references after rewriting.
    pub local_reference_path: String,
}

impl MediaDescriptor {
    /// Returns the disk location as a path.
    #[must_use]
    pub fn disk_path(&self) -> &Path {
        Path::new(&self.local_disk_path)
    }
}

/// How a filename is derived from a bare URL when the source carries none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilenameStrategy {
    /// Last `/`-separated segment, for hosts that embed a unique id in it.
    LastSegment,
    /// Last two segments joined with `-`, for hosts that reuse basenames
    /// across folders.
    #[default]
    LastTwoSegments,
    /// SHA-256 prefix of the full URL plus the original extension.
    UrlFingerprint,
}

impl FilenameStrategy {
    /// Derives a filename from `url`.
    #[must_use]
    pub fn filename_for(self, url: &str) -> String {
        match self {
            Self::LastSegment => url.rsplit('/').next().unwrap_or(url).to_string(),
            Self::LastTwoSegments => {
                let mut tail: Vec<&str> = url.rsplit('/').take(2).collect();
                tail.reverse();
                tail.join("-")
            }
            Self::UrlFingerprint => fingerprint_filename(url),
        }
    }
}

fn fingerprint_filename(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut name = String::with_capacity(FINGERPRINT_HEX_LEN + MAX_EXTENSION_LEN);
    for byte in digest.iter().take(FINGERPRINT_HEX_LEN / 2) {
        let _ = write!(name, "{byte:02x}");
    }
    if let Some(ext) = extension_from_url(url) {
        name.push_str(&ext);
    }
    name
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index..];
    if ext.len() <= 1 || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Builds [`MediaDescriptor`]s from the run's media prefixes.
///
/// Paths are plain string concatenations of prefix and filename; callers
/// that accept untrusted names must make sure they are filesystem-safe.
#[derive(Debug, Clone)]
pub struct PathDeriver {
    media_disk_path: String,
    media_reference_path: String,
    strategy: FilenameStrategy,
}

impl PathDeriver {
    /// Creates a deriver for the given prefixes and URL naming strategy.
    #[must_use]
    pub fn new(
        media_disk_path: impl Into<String>,
        media_reference_path: impl Into<String>,
        strategy: FilenameStrategy,
    ) -> Self {
        Self {
            media_disk_path: media_disk_path.into(),
            media_reference_path: media_reference_path.into(),
            strategy,
        }
    }

    /// Derives the descriptor for `external_url`.
    ///
    /// A non-empty `explicit_name` is used verbatim; otherwise the filename
    /// comes from the configured [`FilenameStrategy`]. The same inputs always
    /// yield the same descriptor.
    #[must_use]
    pub fn derive(&self, external_url: &str, explicit_name: Option<&str>) -> MediaDescriptor {
        let filename = explicit_name
            .filter(|name| !name.is_empty())
            .map_or_else(|| self.strategy.filename_for(external_url), str::to_string);

        MediaDescriptor {
            external_url: external_url.to_string(),
            local_disk_path: format!("{}{filename}", self.media_disk_path),
            local_reference_path: format!("{}{filename}", self.media_reference_path),
            filename,
        }
    }
}
