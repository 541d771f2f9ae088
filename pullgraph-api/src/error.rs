use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by graph and index collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The collaborator does not implement the requested capability.
    ///
    /// Distinct from every other variant so callers can tell a planning gap
    /// from a runtime fault.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("close failed: {0}")]
    CloseFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Returns true if this is the "capability not implemented" signal.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn unsupported_is_distinct_from_storage_failures() {
        assert!(Error::unsupported("mixed predicates").is_unsupported());
        assert!(!Error::Storage("disk".into()).is_unsupported());
        assert!(!Error::CloseFailed("reader".into()).is_unsupported());
    }

    #[test]
    fn display_includes_detail() {
        let err = Error::unsupported("exists over two readers");
        assert_eq!(
            err.to_string(),
            "unsupported operation: exists over two readers"
        );
    }
}
