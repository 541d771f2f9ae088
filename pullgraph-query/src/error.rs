//! Error and result types for the query crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A graph, index or row source collaborator failed.
    #[error(transparent)]
    Collaborator(pullgraph_api::Error),

    /// A collaborator or operator does not implement the requested capability.
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("missing parameter: ${0}")]
    MissingParameter(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("no index on :{label}({property})")]
    IndexNotFound { label: String, property: String },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("argument column not bound: {0}")]
    UnboundArgument(String),

    #[error("row schema mismatch: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the "capability not implemented" signal, whether raised by
    /// the engine or passed up from a collaborator.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Error::Unsupported(_) => true,
            Error::Collaborator(inner) => inner.is_unsupported(),
            _ => false,
        }
    }
}

impl From<pullgraph_api::Error> for Error {
    fn from(err: pullgraph_api::Error) -> Self {
        match err {
            pullgraph_api::Error::Unsupported(msg) => Error::Unsupported(msg),
            other => Error::Collaborator(other),
        }
    }
}
