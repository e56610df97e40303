use thiserror::Error;

use crate::DocumentFormat;

/// Errors raised by document stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Source text could not be parsed.
    #[error("malformed {format} document: {message}")]
    Parse { format: DocumentFormat, message: String },
    /// A single-value lookup matched more than one node.
    #[error("path '{path}' matched {count} nodes where at most one was expected")]
    MultipleMatches { path: String, count: usize },
    /// The path expression uses syntax the store does not understand.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    /// A document was handed to a store for the other format.
    #[error("{store} store cannot operate on a {document} document")]
    FormatMismatch { store: DocumentFormat, document: DocumentFormat },
    /// The document could not be rendered back to text.
    #[error("failed to serialize {format} document: {message}")]
    Serialize { format: DocumentFormat, message: String },
}

impl DocumentError {
    pub(crate) fn parse(format: DocumentFormat, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
