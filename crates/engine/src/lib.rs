//! # Docbind Engine
//!
//! Declarative binding of typed models onto XML and JSON documents, and
//! finder-driven fetching of those models from REST endpoints.
//!
//! ## Key Features
//!
//! - **Typed fields**: text, integer, boolean, float and date fields resolved
//!   from a path expression, with defaults for absent values
//! - **Collections**: repeated nodes materialized as scalar lists or nested
//!   models, optionally ordered by a field of the element model
//! - **Lazy models**: the source document is parsed on first access and
//!   resolved values are cached per instance
//! - **Finders**: an order-independent, duplicate-aware mapping from filter
//!   identifiers to URL templates
//!
//! ## Usage
//!
//! ```rust
//! use docbind_document::DocumentFormat;
//! use docbind_engine::{FieldSpec, Model, Schema};
//!
//! let schema = Schema::builder("Muppet", DocumentFormat::Json)
//!     .field(FieldSpec::text("name", "kiddie.value"))
//!     .finder(&["number", "street"], "/number/%s/street/%s")
//!     .build()?;
//!
//! let muppet = Model::from_source(schema, r#"{"kiddie":{"value":"Gonzo"}}"#);
//! assert_eq!(muppet.text("name")?.as_deref(), Some("Gonzo"));
//! muppet.set("name", "Fozzie")?;
//! assert_eq!(muppet.text("name")?.as_deref(), Some("Fozzie"));
//! # Ok::<(), docbind_engine::BindError>(())
//! ```
//!
//! ## Architecture
//!
//! - **`field`**: field declarations, coercion and write-back encoding
//! - **`schema`**: immutable model declarations built with [`SchemaBuilder`]
//! - **`model`**: instances with lazily parsed documents and cached values
//! - **`finder`**: finder registration and URL building
//! - **`manager`**: `get`, `filter`, `count` and `all` over an [`docbind_api::HttpClient`]

pub mod error;
pub mod field;
pub mod finder;
pub mod manager;
pub mod model;
pub mod schema;
pub mod value;

pub use error::BindError;
pub use field::{ElementKind, FieldKind, FieldSpec, ScalarKind};
pub use finder::{Finder, FinderTable};
pub use manager::{Filters, ModelManager, Query};
pub use model::Model;
pub use schema::{Schema, SchemaBuilder, Validator};
pub use value::FieldValue;
