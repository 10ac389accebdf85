//! Error types for document rewriting.

use thiserror::Error;

/// Errors that can occur while rewriting a document.
///
/// Classification itself never fails; the only failure is the nesting guard.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// The document nests deeper than the configured limit.
    #[error("document nesting depth {depth} exceeds the limit of {limit}")]
    RecursionLimitExceeded {
        /// Depth of the node that tripped the guard.
        depth: usize,
        /// Configured maximum depth.
        limit: usize,
    },
}
