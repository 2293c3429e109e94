//! Expansion error types

use std::io;
use thiserror::Error;

/// Errors from the include pass
#[derive(Debug, Error)]
pub enum InclusionError {
    #[error("Recursive inclusion detected: {id}")]
    RecursiveInclusion { id: String },

    #[error("Include file not found: {id}")]
    IncludeNotFound { id: String },

    #[error("Failed to read include {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: io::Error,
    },
}

/// Errors from the snippet pass
#[derive(Debug, Error)]
pub enum SnippetError {
    /// Covers both cycles and snippet files that hold further snippet directives
    #[error("Recursive snippet detected: {id}")]
    RecursiveSnippet { id: String },

    #[error("Snippet file not found: {id}")]
    SnippetNotFound { id: String },

    #[error("Failed to read snippet {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: io::Error,
    },
}
