//! Registry crate for building docbind schemas from manifests.
//!
//! A manifest (YAML or JSON, see `docbind-types`) declares models by name.
//! This crate loads it, resolves model-typed collection elements in
//! dependency order, and produces one shared [`docbind_engine::Schema`] per
//! model, with finders registered and required fields validated.

pub mod config;
pub mod error;
pub mod models;

pub use config::{SCHEMA_PATH_ENV, default_manifest_path, load_manifest};
pub use error::RegistryError;
pub use models::SchemaRegistry;
