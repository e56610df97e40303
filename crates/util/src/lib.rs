//! Shared helpers for the docbind workspace.

pub mod async_runtime;
pub mod date_handling;
pub mod http_path_resolution;
pub mod path_processing;

pub use async_runtime::{RuntimeError, block_on};
pub use http_path_resolution::{TemplateError, count_placeholders, encode_path_value, substitute_placeholders};
pub use path_processing::expand_tilde;
