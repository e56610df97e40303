use docbind_api::TransportError;
use docbind_document::{DocumentError, DocumentFormat};
use thiserror::Error;

/// Errors raised while binding documents to models.
#[derive(Debug, Error)]
pub enum BindError {
    /// The model's source text is not a well-formed document.
    #[error("malformed {format} document: {message}")]
    Parse { format: DocumentFormat, message: String },
    /// A single-value field matched several nodes.
    #[error("path '{path}' matched {count} nodes where at most one was expected")]
    MultipleMatches { path: String, count: usize },
    /// A present value could not be converted to the field's type.
    #[error("field '{field}': cannot read '{value}' as {expected}")]
    Coercion { field: String, value: String, expected: &'static str },
    #[error("no finder registered on {model} for keys ({})", .keys.join(", "))]
    NoRegisteredFinder { model: String, keys: Vec<String> },
    #[error("{model} matching query does not exist ({url})")]
    DoesNotExist { model: String, url: String },
    /// The schema's validation hook rejected a freshly loaded instance.
    #[error("{model} failed validation: {message}")]
    Validation { model: String, message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{model} has no field named '{field}'")]
    UnknownField { model: String, field: String },
    #[error("invalid finder '{template}': {reason}")]
    InvalidFinder { template: String, reason: String },
    #[error("invalid schema {model}: {reason}")]
    InvalidSchema { model: String, reason: String },
    #[error("field '{field}' holds {found}, not {expected}")]
    TypeMismatch { field: String, expected: &'static str, found: &'static str },
    /// Any other document store failure (bad path syntax, format mismatch).
    #[error(transparent)]
    Document(DocumentError),
}

impl From<DocumentError> for BindError {
    fn from(error: DocumentError) -> Self {
        match error {
            DocumentError::Parse { format, message } => BindError::Parse { format, message },
            DocumentError::MultipleMatches { path, count } => BindError::MultipleMatches { path, count },
            other => BindError::Document(other),
        }
    }
}

impl BindError {
    pub(crate) fn invalid_schema(model: &str, reason: impl Into<String>) -> Self {
        BindError::InvalidSchema {
            model: model.to_string(),
            reason: reason.into(),
        }
    }
}
