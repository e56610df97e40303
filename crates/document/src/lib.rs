//! Document stores for docbind.
//!
//! A [`DocumentStore`] parses raw text into a [`Document`], resolves path
//! expressions against it, and renders it back to text. Two stores ship with
//! the crate:
//!
//! - [`XmlStore`]: element trees with attribute selectors and default
//!   namespace matching (`/root/child/@id`).
//! - [`JsonStore`]: key-ordered JSON values addressed with dotted paths
//!   (`kiddie.names`).
//!
//! Resolution always yields every match in document order; the single-value
//! policy (exactly one, none, or ambiguous) is layered on top by
//! [`DocumentStore::resolve_one`].

mod document;
mod error;
mod json;
mod store;
mod xml;

pub use document::{Document, DocumentFormat, Match, Scalar};
pub use error::DocumentError;
pub use json::JsonStore;
pub use store::DocumentStore;
pub use xml::{XmlAttribute, XmlElement, XmlNode, XmlStore};
