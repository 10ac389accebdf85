//! Attachment recognition for exported documents.
//!
//! An [`AttachmentMatcher`] inspects one document node and reports whether it
//! refers to remote media, returning a closed [`Attachment`] classification.
//! Two source shapes are supported:
//!
//! - **Host pattern** sources (Fieldbook, Airtable) store attachments as bare
//!   URL strings pointing at a known attachment host.
//! - **File object** sources (Directus) store attachments as
//!   `{"meta": {"type": "item", "table": <files>}, "data": {"url", "name"}}`
//!   wrappers, or as `"collection"` wrappers holding several files.
//!
//! Classification never fails: anything malformed is
//! [`Attachment::NotAttachment`] and passes through the rewrite untouched.

use regex::Regex;
use serde_json::{Map, Value};

/// Metadata key on file-object wrappers.
const META_KEY: &str = "meta";
/// Payload key on file-object wrappers.
const DATA_KEY: &str = "data";
/// URL field inside a file payload.
pub const URL_KEY: &str = "url";
/// Display-name field inside a file payload.
pub const NAME_KEY: &str = "name";

const ITEM_TYPE: &str = "item";
const COLLECTION_TYPE: &str = "collection";

/// A resolved reference to one remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef<'a> {
    /// Absolute remote URL.
    pub url: String,
    /// Display name carried by the source, if any.
    pub name: Option<&'a str>,
}

/// Classification of a single document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment<'a> {
    /// Not a reference; the node is traversed or passed through.
    NotAttachment,
    /// A bare URL string.
    Scalar {
        /// The matched URL.
        url: &'a str,
    },
    /// A single file-object wrapper.
    Object(FileRef<'a>),
    /// A collection wrapper; each element is classified on its own.
    Collection {
        /// The wrapped elements.
        elements: &'a [Value],
    },
}

/// Recognizes attachment references for one source shape.
#[derive(Debug, Clone)]
pub enum AttachmentMatcher {
    /// Strings containing a match for the host pattern are attachments.
    HostPattern {
        /// Pattern searched for within string values.
        pattern: Regex,
    },
    /// Meta-tagged file objects are attachments.
    FileObject {
        /// Value of `meta.table` marking file entities.
        file_table: String,
        /// Prefix for relative `data.url` values.
        base_url: String,
    },
}

impl AttachmentMatcher {
    /// Creates a host-pattern matcher.
    #[must_use]
    pub fn host_pattern(pattern: Regex) -> Self {
        Self::HostPattern { pattern }
    }

    /// Creates a file-object matcher.
    #[must_use]
    pub fn file_object(file_table: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::FileObject {
            file_table: file_table.into(),
            base_url: base_url.into(),
        }
    }

    /// Classifies `value`.
    #[must_use]
    pub fn classify<'a>(&self, value: &'a Value) -> Attachment<'a> {
        match self {
            Self::HostPattern { pattern } => match value {
                Value::String(s) if pattern.is_match(s) => Attachment::Scalar { url: s },
                _ => Attachment::NotAttachment,
            },
            Self::FileObject {
                file_table,
                base_url,
            } => classify_file_object(value, file_table, base_url),
        }
    }

    /// Resolves a bare file record found directly inside a collection,
    /// i.e. an object with a non-empty `url` and no wrapper.
    #[must_use]
    pub fn collection_record<'a>(&self, value: &'a Value) -> Option<FileRef<'a>> {
        let Self::FileObject { base_url, .. } = self else {
            return None;
        };
        file_payload(value.as_object()?, base_url)
    }
}

fn classify_file_object<'a>(value: &'a Value, file_table: &str, base_url: &str) -> Attachment<'a> {
    let Some(object) = value.as_object() else {
        return Attachment::NotAttachment;
    };
    let Some(meta) = object.get(META_KEY).and_then(Value::as_object) else {
        return Attachment::NotAttachment;
    };
    if meta.get("table").and_then(Value::as_str) != Some(file_table) {
        return Attachment::NotAttachment;
    }

    match meta.get("type").and_then(Value::as_str) {
        Some(ITEM_TYPE) => object
            .get(DATA_KEY)
            .and_then(Value::as_object)
            .and_then(|data| file_payload(data, base_url))
            .map_or(Attachment::NotAttachment, Attachment::Object),
        Some(COLLECTION_TYPE) => match object.get(DATA_KEY) {
            Some(Value::Array(elements)) => Attachment::Collection { elements },
            _ => Attachment::NotAttachment,
        },
        _ => Attachment::NotAttachment,
    }
}

fn file_payload<'a>(data: &'a Map<String, Value>, base_url: &str) -> Option<FileRef<'a>> {
    let url = data
        .get(URL_KEY)
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())?;
    Some(FileRef {
        url: absolute_url(base_url, url),
        name: data.get(NAME_KEY).and_then(Value::as_str),
    })
}

/// Prefixes relative URLs with `base_url`; absolute URLs are kept.
fn absolute_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{base_url}{url}")
    }
}
