//! Media descriptors and local path derivation.
//!
//! Every attachment found in a document resolves to a [`MediaDescriptor`]:
//! the remote URL it was found under plus the two local locations derived
//! for it (one for writing to disk, one for substitution into the document).

mod paths;

pub use paths::{FilenameStrategy, MediaDescriptor, PathDeriver};
