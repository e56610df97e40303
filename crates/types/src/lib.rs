//! Shared type definitions for docbind schema manifests.

pub mod manifest;

pub use manifest::{CollectionElementDefinition, FieldDefinition, FieldKindDefinition, FinderDefinition, ModelDefinition, ModelFormat, SchemaManifest};
