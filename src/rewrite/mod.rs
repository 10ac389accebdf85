//! Recursive rewriting of remote attachment references.
//!
//! [`DocumentRewriter`] walks a document depth-first, asks its
//! [`AttachmentMatcher`] about every node, replaces each attachment with its
//! local reference path, and collects one [`MediaDescriptor`] per attachment
//! in pre-order. The input document is only borrowed; the result is a freshly
//! built tree, so the same input can be rewritten any number of times.
//!
//! # Example
//!
//! ```
//! use media_export::attachment::AttachmentMatcher;
//! use media_export::media::{FilenameStrategy, PathDeriver};
//! use media_export::rewrite::{DocumentRewriter, RewriteOptions};
//! use regex::Regex;
//! use serde_json::json;
//!
//! let matcher = AttachmentMatcher::host_pattern(Regex::new("media\\.example\\.com").unwrap());
//! let deriver = PathDeriver::new("./media/", "media/", FilenameStrategy::LastTwoSegments);
//! let rewriter = DocumentRewriter::new(&matcher, &deriver, RewriteOptions::default());
//!
//! let rewrite = rewriter
//!     .rewrite(&json!({"a": "https://media.example.com/x/photo.png"}))
//!     .unwrap();
//! assert_eq!(rewrite.document, json!({"a": "media/x-photo.png"}));
//! assert_eq!(rewrite.media[0].local_disk_path, "./media/x-photo.png");
//! ```

mod error;

pub use error::RewriteError;

use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::attachment::{Attachment, AttachmentMatcher, FileRef, URL_KEY};
use crate::media::{MediaDescriptor, PathDeriver};

/// Default maximum container nesting accepted by the rewriter.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Prefix of the companion key holding an attachment's remote URL.
pub const MEDIA_URL_KEY: &str = "$mediaUrl$";

/// Prefix of the companion key holding an attachment's local filename.
pub const MEDIA_FILENAME_KEY: &str = "$mediaFilename$";

/// JSON pointer to the URL inside a file-object wrapper.
const WRAPPED_URL_POINTER: &str = "/data/url";

/// Behaviour switches for a rewrite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Keep file-object wrappers and swap only their URL field, instead of
    /// replacing the whole wrapper with the reference path.
    pub return_full_objects: bool,
    /// Add `$mediaUrl$<key>` / `$mediaFilename$<key>` siblings next to
    /// string attachments held directly by a mapping.
    pub annotate_original_urls: bool,
    /// Deepest container nesting accepted before failing.
    pub max_nesting_depth: usize,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            return_full_objects: false,
            annotate_original_urls: false,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Output of a rewrite pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    /// The document with every attachment pointing at its local path.
    pub document: Value,
    /// One descriptor per attachment occurrence, in pre-order.
    pub media: Vec<MediaDescriptor>,
}

/// Rewrites attachment references in arbitrarily nested documents.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRewriter<'a> {
    matcher: &'a AttachmentMatcher,
    deriver: &'a PathDeriver,
    options: RewriteOptions,
}

impl<'a> DocumentRewriter<'a> {
    /// Creates a rewriter for one source shape and media layout.
    #[must_use]
    pub fn new(
        matcher: &'a AttachmentMatcher,
        deriver: &'a PathDeriver,
        options: RewriteOptions,
    ) -> Self {
        Self {
            matcher,
            deriver,
            options,
        }
    }

    /// Rewrites `document`, returning the new tree and the media it references.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::RecursionLimitExceeded`] when the document nests
    /// deeper than [`RewriteOptions::max_nesting_depth`].
    #[instrument(level = "debug", skip(self, document))]
    pub fn rewrite(&self, document: &Value) -> Result<Rewrite, RewriteError> {
        let mut media = Vec::new();
        let document = self.visit(document, 0, &mut media)?;
        debug!(attachments = media.len(), "document rewritten");
        Ok(Rewrite { document, media })
    }

    fn visit(
        &self,
        node: &Value,
        depth: usize,
        media: &mut Vec<MediaDescriptor>,
    ) -> Result<Value, RewriteError> {
        self.check_depth(depth)?;
        let class = self.matcher.classify(node);
        self.apply(node, class, depth, media)
    }

    fn apply(
        &self,
        node: &Value,
        class: Attachment<'_>,
        depth: usize,
        media: &mut Vec<MediaDescriptor>,
    ) -> Result<Value, RewriteError> {
        match class {
            Attachment::Scalar { url } => {
                Ok(Value::String(record(self.deriver, url, None, media).local_reference_path))
            }
            Attachment::Object(file) => {
                let descriptor = record(self.deriver, &file.url, file.name, media);
                if self.options.return_full_objects {
                    Ok(with_wrapped_url(node, descriptor.local_reference_path))
                } else {
                    Ok(Value::String(descriptor.local_reference_path))
                }
            }
            Attachment::Collection { .. } => self.visit_collection(node, depth, media),
            Attachment::NotAttachment => match node {
                Value::Object(map) => self.visit_map(map, depth, media).map(Value::Object),
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.visit(item, depth + 1, media))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                scalar => Ok(scalar.clone()),
            },
        }
    }

    fn visit_map(
        &self,
        map: &Map<String, Value>,
        depth: usize,
        media: &mut Vec<MediaDescriptor>,
    ) -> Result<Map<String, Value>, RewriteError> {
        let mut out = Map::with_capacity(map.len());
        let mut companions = Vec::new();

        for (key, child) in map {
            self.check_depth(depth + 1)?;
            let class = self.matcher.classify(child);
            let rewritten = match class {
                Attachment::Scalar { url } if self.options.annotate_original_urls => {
                    let descriptor = record(self.deriver, url, None, media);
                    companions.push((format!("{MEDIA_URL_KEY}{key}"), Value::from(url)));
                    companions.push((
                        format!("{MEDIA_FILENAME_KEY}{key}"),
                        Value::String(descriptor.filename),
                    ));
                    Value::String(descriptor.local_reference_path)
                }
                class => self.apply(child, class, depth + 1, media)?,
            };
            out.insert(key.clone(), rewritten);
        }

        out.extend(companions);
        Ok(out)
    }

    /// Rewrites a collection wrapper: the wrapper and its metadata are kept,
    /// each element of `data` is resolved as its own attachment.
    fn visit_collection(
        &self,
        node: &Value,
        depth: usize,
        media: &mut Vec<MediaDescriptor>,
    ) -> Result<Value, RewriteError> {
        let Value::Object(map) = node else {
            return Ok(node.clone());
        };

        let mut out = Map::with_capacity(map.len());
        for (key, child) in map {
            let rewritten = match child {
                Value::Array(elements) if key == "data" => {
                    self.check_depth(depth + 1)?;
                    let mut items = Vec::with_capacity(elements.len());
                    for element in elements {
                        items.push(self.visit_collection_element(element, depth + 2, media)?);
                    }
                    Value::Array(items)
                }
                other => self.visit(other, depth + 1, media)?,
            };
            out.insert(key.clone(), rewritten);
        }
        Ok(Value::Object(out))
    }

    /// Elements keep their shape; only the leaf URL field is substituted.
    fn visit_collection_element(
        &self,
        element: &Value,
        depth: usize,
        media: &mut Vec<MediaDescriptor>,
    ) -> Result<Value, RewriteError> {
        self.check_depth(depth)?;
        match self.matcher.classify(element) {
            Attachment::Object(file) => {
                let descriptor = record(self.deriver, &file.url, file.name, media);
                Ok(with_wrapped_url(element, descriptor.local_reference_path))
            }
            Attachment::NotAttachment => match self.matcher.collection_record(element) {
                Some(file) => Ok(with_record_url(element, &file, self.deriver, media)),
                None => self.apply(element, Attachment::NotAttachment, depth, media),
            },
            class => self.apply(element, class, depth, media),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), RewriteError> {
        if depth > self.options.max_nesting_depth {
            return Err(RewriteError::RecursionLimitExceeded {
                depth,
                limit: self.options.max_nesting_depth,
            });
        }
        Ok(())
    }
}

fn record(
    deriver: &PathDeriver,
    url: &str,
    name: Option<&str>,
    media: &mut Vec<MediaDescriptor>,
) -> MediaDescriptor {
    let descriptor = deriver.derive(url, name);
    trace!(
        url = %descriptor.external_url,
        reference = %descriptor.local_reference_path,
        "attachment rewritten"
    );
    media.push(descriptor.clone());
    descriptor
}

fn with_wrapped_url(node: &Value, reference: String) -> Value {
    let mut copy = node.clone();
    if let Some(slot) = copy.pointer_mut(WRAPPED_URL_POINTER) {
        *slot = Value::String(reference);
    }
    copy
}

fn with_record_url(
    element: &Value,
    file: &FileRef<'_>,
    deriver: &PathDeriver,
    media: &mut Vec<MediaDescriptor>,
) -> Value {
    let descriptor = record(deriver, &file.url, file.name, media);
    let mut copy = element.clone();
    if let Some(record) = copy.as_object_mut() {
        record.insert(
            URL_KEY.to_string(),
            Value::String(descriptor.local_reference_path),
        );
    }
    copy
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use regex::Regex;
    use serde_json::json;

    use super::*;
    use crate::media::FilenameStrategy;

    fn host_matcher() -> AttachmentMatcher {
        AttachmentMatcher::host_pattern(Regex::new(r"media\.example\.com").unwrap())
    }

    fn deriver() -> PathDeriver {
        PathDeriver::new("./media/", "media/", FilenameStrategy::LastTwoSegments)
    }

    fn nested_arrays(levels: usize) -> Value {
        let mut value = json!("leaf");
        for _ in 0..levels {
            value = Value::Array(vec![value]);
        }
        value
    }

    #[test]
    fn test_scalar_attachment_replaced_with_reference_path() {
        let matcher = host_matcher();
        let deriver = deriver();
        let rewriter = DocumentRewriter::new(&matcher, &deriver, RewriteOptions::default());

        let rewrite = rewriter
            .rewrite(&json!({"a": "https://media.example.com/x/photo.png"}))
            .unwrap();

        assert_eq!(rewrite.document, json!({"a": "media/x-photo.png"}));
        assert_eq!(rewrite.media.len(), 1);
        assert_eq!(rewrite.media[0].local_disk_path, "./media/x-photo.png");
    }

    #[test]
    fn test_media_collected_in_pre_order() {
        let matcher = host_matcher();
        let deriver = deriver();
        let rewriter = DocumentRewriter::new(&matcher, &deriver, RewriteOptions::default());
        let document = json!({
            "z": "https://media.example.com/a/1.png",
            "sheet": [
                {"img": "https://media.example.com/b/2.png"},
                ["https://media.example.com/c/3.png"]
            ],
            "a": "https://media.example.com/d/4.png"
        });

        let rewrite = rewriter.rewrite(&document).unwrap();
        let names: Vec<&str> = rewrite.media.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(names, ["a-1.png", "b-2.png", "c-3.png", "d-4.png"]);
    }

    #[test]
    fn test_mapping_key_order_preserved() {
        let matcher = host_matcher();
        let deriver = deriver();
        let rewriter = DocumentRewriter::new(&matcher, &deriver, RewriteOptions::default());
        let document = json!({"b": 1, "a": "https://media.example.com/x/y.png", "c": 2});

        let rewrite = rewriter.rewrite(&document).unwrap();
        let keys: Vec<&String> = rewrite.document.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_companion_keys_appended_after_record_fields() {
        let matcher = host_matcher();
        let deriver = deriver();
        let options = RewriteOptions {
            annotate_original_urls: true,
            ..RewriteOptions::default()
        };
        let rewriter = DocumentRewriter::new(&matcher, &deriver, options);
        let document = json!({"photo": "https://media.example.com/x/photo.png", "title": "t"});

        let rewrite = rewriter.rewrite(&document).unwrap();
        assert_eq!(
            rewrite.document,
            json!({
                "photo": "media/x-photo.png",
                "title": "t",
                "$mediaUrl$photo": "https://media.example.com/x/photo.png",
                "$mediaFilename$photo": "x-photo.png"
            })
        );
        let keys: Vec<&String> = rewrite.document.as_object().unwrap().keys().collect();
        assert_eq!(keys[2], "$mediaUrl$photo");
    }

    #[test]
    fn test_companion_keys_not_added_inside_arrays() {
        let matcher = host_matcher();
        let deriver = deriver();
        let options = RewriteOptions {
            annotate_original_urls: true,
            ..RewriteOptions::default()
        };
        let rewriter = DocumentRewriter::new(&matcher, &deriver, options);

        let rewrite = rewriter
            .rewrite(&json!({"gallery": ["https://media.example.com/x/1.png"]}))
            .unwrap();
        assert_eq!(rewrite.document, json!({"gallery": ["media/x-1.png"]}));
    }

    #[test]
    fn test_depth_guard_trips_on_deep_nesting() {
        let matcher = host_matcher();
        let deriver = deriver();
        let options = RewriteOptions {
            max_nesting_depth: 5,
            ..RewriteOptions::default()
        };
        let rewriter = DocumentRewriter::new(&matcher, &deriver, options);

        assert!(rewriter.rewrite(&nested_arrays(5)).is_ok());
        assert_eq!(
            rewriter.rewrite(&nested_arrays(6)),
            Err(RewriteError::RecursionLimitExceeded { depth: 6, limit: 5 })
        );
    }

    #[test]
    fn test_depth_guard_applies_to_mappings() {
        let matcher = host_matcher();
        let deriver = deriver();
        let options = RewriteOptions {
            max_nesting_depth: 1,
            ..RewriteOptions::default()
        };
        let rewriter = DocumentRewriter::new(&matcher, &deriver, options);

        assert!(rewriter.rewrite(&json!({"a": 1})).is_ok());
        assert!(matches!(
            rewriter.rewrite(&json!({"a": {"b": 1}})),
            Err(RewriteError::RecursionLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_directus_item_with_full_objects_swaps_url_only() {
        let matcher = AttachmentMatcher::file_object("files", "https://h");
        let deriver = deriver();
        let options = RewriteOptions {
            return_full_objects: true,
            ..RewriteOptions::default()
        };
        let rewriter = DocumentRewriter::new(&matcher, &deriver, options);
        let document = json!({
            "cover": {
                "meta": {"type": "item", "table": "files"},
                "data": {"id": 1, "url": "/u/1", "name": "cat.jpg"}
            }
        });

        let rewrite = rewriter.rewrite(&document).unwrap();
        assert_eq!(
            rewrite.document,
            json!({
                "cover": {
                    "meta": {"type": "item", "table": "files"},
                    "data": {"id": 1, "url": "media/cat.jpg", "name": "cat.jpg"}
                }
            })
        );
        assert_eq!(rewrite.media[0].external_url, "https://h/u/1");
    }

    #[test]
    fn test_directus_collection_preserves_wrapper_and_elements() {
        let matcher = AttachmentMatcher::file_object("files", "https://h");
        let deriver = deriver();
        let rewriter = DocumentRewriter::new(&matcher, &deriver, RewriteOptions::default());
        let document = json!({
            "meta": {"type": "collection", "table": "files", "total": 3},
            "data": [
                {"id": 1, "url": "/u/1", "name": "a.png"},
                {"meta": {"type": "item", "table": "files"}, "data": {"url": "/u/2", "name": "b.png"}},
                {"id": 3, "caption": "no url here"}
            ]
        });

        let rewrite = rewriter.rewrite(&document).unwrap();
        assert_eq!(
            rewrite.document,
            json!({
                "meta": {"type": "collection", "table": "files", "total": 3},
                "data": [
                    {"id": 1, "url": "media/a.png", "name": "a.png"},
                    {"meta": {"type": "item", "table": "files"}, "data": {"url": "media/b.png", "name": "b.png"}},
                    {"id": 3, "caption": "no url here"}
                ]
            })
        );
        assert_eq!(rewrite.media.len(), 2);
    }
}
