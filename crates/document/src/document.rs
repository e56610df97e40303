use std::borrow::Cow;
use std::fmt;

use serde_json::{Number, Value};

use crate::{DocumentStore, JsonStore, XmlElement, XmlStore};

/// The two document shapes understood by docbind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentFormat {
    #[default]
    Xml,
    Json,
}

impl DocumentFormat {
    /// The built-in store for this format.
    pub fn store(self) -> &'static dyn DocumentStore {
        match self {
            DocumentFormat::Xml => &XmlStore,
            DocumentFormat::Json => &JsonStore,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Xml => f.write_str("xml"),
            DocumentFormat::Json => f.write_str("json"),
        }
    }
}

/// A parsed document: an XML element tree or a JSON value graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Xml(XmlElement),
    Json(Value),
}

impl Document {
    pub fn format(&self) -> DocumentFormat {
        match self {
            Document::Xml(_) => DocumentFormat::Xml,
            Document::Json(_) => DocumentFormat::Json,
        }
    }
}

/// A single node located by a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// An XML element, with its whole subtree.
    Element(XmlElement),
    /// The value of an XML attribute.
    Attribute(String),
    /// A JSON value (never `null`; nulls count as absent).
    Json(Value),
}

/// The scalar content of a match, before any type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    /// Textual rendering, used by text fields and error messages.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Scalar::Text(text) => Cow::Borrowed(text),
            Scalar::Number(number) => Cow::Owned(number.to_string()),
            Scalar::Bool(flag) => Cow::Owned(flag.to_string()),
        }
    }
}

impl Match {
    /// Scalar content of the match.
    ///
    /// Returns `None` for an XML element without any text, which callers treat
    /// the same as a missing node. JSON objects and arrays render as compact
    /// JSON text.
    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Match::Element(element) => element.text().map(Scalar::Text),
            Match::Attribute(value) => Some(Scalar::Text(value.clone())),
            Match::Json(Value::Null) => None,
            Match::Json(Value::String(text)) => Some(Scalar::Text(text.clone())),
            Match::Json(Value::Number(number)) => Some(Scalar::Number(number.clone())),
            Match::Json(Value::Bool(flag)) => Some(Scalar::Bool(*flag)),
            Match::Json(other) => Some(Scalar::Text(other.to_string())),
        }
    }

    /// Converts the match into a standalone document rooted at the matched node.
    ///
    /// Attribute values have no tree of their own and yield `None`.
    pub fn into_document(self) -> Option<Document> {
        match self {
            Match::Element(element) => Some(Document::Xml(element)),
            Match::Attribute(_) => None,
            Match::Json(value) => Some(Document::Json(value)),
        }
    }
}
