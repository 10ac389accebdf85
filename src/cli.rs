//! CLI argument definitions using clap derive macros.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use media_export::{ExportConfig, FilenameStrategy, SourceProfile};

/// Rewrite remote attachments in an exported document and mirror the media.
///
/// Reads an already-fetched JSON export (Fieldbook book, Airtable base,
/// Directus items, or any JSON with attachment URLs), points every
/// attachment at a local file, downloads the media, and writes the result.
#[derive(Parser, Debug)]
#[command(name = "media-export")]
#[command(author, version, about)]
pub struct Args {
    /// Exported JSON document to process ("-" or omitted reads stdin)
    pub input: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// JSON config file; command-line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where to write the rewritten JSON document
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Source preset describing how attachments are stored
    #[arg(short, long, value_enum)]
    pub source: Option<SourceKind>,

    /// Regex identifying attachment URLs (uses a generic host-pattern source)
    #[arg(long, conflicts_with = "source")]
    pub pattern: Option<String>,

    /// Filename derivation for attachments without an explicit name
    #[arg(long, value_enum)]
    pub filename: Option<FilenameArg>,

    /// Record original URL and filename next to rewritten string attachments
    #[arg(long, requires = "pattern")]
    pub annotate: bool,

    /// Prefix for relative file URLs (Directus)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Prefix used to write media and check for existing files
    #[arg(long)]
    pub media_path: Option<String>,

    /// Prefix substituted into the document for each attachment
    #[arg(long)]
    pub media_book_path: Option<String>,

    /// Keep file objects and only swap their URL field
    #[arg(long)]
    pub full_objects: bool,

    /// Pretty-print the written JSON
    #[arg(long)]
    pub pretty: bool,

    /// Download media even when the file already exists
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Maximum nesting depth accepted in the input document
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=256))]
    pub max_depth: Option<u16>,
}

/// Source presets selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Attachment URLs on fieldbook.com/attachments
    Fieldbook,
    /// Attachment URLs on dl.airtable.com, with companion keys
    Airtable,
    /// directus_files objects
    Directus,
}

/// Filename strategies selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilenameArg {
    /// Last URL path segment
    LastSegment,
    /// Last two URL path segments joined with '-'
    LastTwoSegments,
    /// Hash of the full URL plus its extension
    Fingerprint,
}

impl From<FilenameArg> for FilenameStrategy {
    fn from(value: FilenameArg) -> Self {
        match value {
            FilenameArg::LastSegment => Self::LastSegment,
            FilenameArg::LastTwoSegments => Self::LastTwoSegments,
            FilenameArg::Fingerprint => Self::UrlFingerprint,
        }
    }
}

impl Args {
    /// Returns the input file, or `None` when the document comes from stdin.
    #[must_use]
    pub fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|path| path.as_os_str() != "-")
    }

    /// Applies command-line overrides on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: ExportConfig) -> ExportConfig {
        if let Some(output) = &self.output {
            config.data_path.clone_from(output);
        }
        if let Some(media_path) = &self.media_path {
            config.media_disk_path.clone_from(media_path);
        }
        if let Some(media_book_path) = &self.media_book_path {
            config.media_reference_path.clone_from(media_book_path);
        }
        if self.full_objects {
            config.return_full_objects = true;
        }
        if self.pretty {
            config.prettify_json = true;
        }
        if self.no_skip_existing {
            config.skip_existing_files = false;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = usize::from(concurrency);
        }
        if let Some(max_depth) = self.max_depth {
            config.max_nesting_depth = usize::from(max_depth);
        }

        if let Some(filename) = self.filename {
            config.filename = Some(filename.into());
        }

        if let Some(pattern) = &self.pattern {
            config.source = SourceProfile::HostPattern {
                pattern: pattern.clone(),
                filename: FilenameStrategy::default(),
                annotate_original_urls: self.annotate,
            };
        } else if let Some(kind) = self.source {
            config.source = match (kind, std::mem::take(&mut config.source)) {
                (SourceKind::Fieldbook, _) => SourceProfile::Fieldbook,
                (SourceKind::Airtable, _) => SourceProfile::Airtable,
                // A base URL from the config file survives the preset flag.
                (SourceKind::Directus, current @ SourceProfile::Directus { .. }) => current,
                (SourceKind::Directus, _) => SourceProfile::Directus {
                    base_url: String::new(),
                },
            };
        }

        if let Some(base_url) = &self.base_url {
            match &mut config.source {
                SourceProfile::Directus { base_url: current }
                | SourceProfile::FileObject {
                    base_url: current, ..
                } => current.clone_from(base_url),
                _ => {}
            }
        }

        config
    }
}
