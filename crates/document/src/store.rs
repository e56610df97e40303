use serde_json::Value;

use crate::{Document, DocumentError, DocumentFormat, Match};

/// Parsing, path resolution and rendering for one document format.
///
/// Implementations are stateless and shared; all methods take the document
/// explicitly.
pub trait DocumentStore: Send + Sync {
    /// The format this store handles.
    fn format(&self) -> DocumentFormat;

    /// Parses raw source text.
    fn parse(&self, raw: &str) -> Result<Document, DocumentError>;

    /// Resolves `path` to every matching node, in document order.
    ///
    /// `namespace` is the default namespace applied to unqualified element
    /// steps; stores without namespaces ignore it.
    fn resolve(&self, document: &Document, path: &str, namespace: Option<&str>) -> Result<Vec<Match>, DocumentError>;

    /// Renders the document back to text.
    fn serialize(&self, document: &Document) -> Result<String, DocumentError>;

    /// Writes a scalar value at `path`.
    ///
    /// Returns `Ok(false)` when the store cannot place the value (for example
    /// a missing XML element, or a structured value in an XML document).
    fn assign(&self, document: &mut Document, path: &str, namespace: Option<&str>, value: &Value) -> Result<bool, DocumentError>;

    /// Resolves a path that must match at most one node.
    ///
    /// # Errors
    /// Returns [`DocumentError::MultipleMatches`] when more than one node
    /// matches; an ambiguous single-value path is never resolved by picking
    /// the first match.
    fn resolve_one(&self, document: &Document, path: &str, namespace: Option<&str>) -> Result<Option<Match>, DocumentError> {
        let mut matches = self.resolve(document, path, namespace)?;
        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(DocumentError::MultipleMatches {
                path: path.to_string(),
                count,
            }),
        }
    }
}
