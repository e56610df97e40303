use docbind_engine::BindError;
use thiserror::Error;

/// Errors raised while turning a manifest into schemas.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no model named '{0}' is registered")]
    UnknownModel(String),
    #[error("{model}.{field} references unknown model '{target}'")]
    UnknownReference { model: String, field: String, target: String },
    /// Model collections that reference each other, in reference order.
    #[error("cyclic model references: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },
    #[error("model '{0}' is declared more than once")]
    DuplicateModel(String),
    #[error("{model}.{field}: {reason}")]
    InvalidField { model: String, field: String, reason: String },
    #[error(transparent)]
    Bind(#[from] BindError),
}
