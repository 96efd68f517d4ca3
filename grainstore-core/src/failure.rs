use std::fmt;

/// Why a storage operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The document does not exist. Reads treat this as a normal outcome, so
    /// it only surfaces from clearing state that was never written
    NotFound,
    /// An insert found a document with the same key already present
    DuplicateKey,
    /// The revision supplied with an update no longer matches the document
    ConcurrencyConflict,
    /// The collection could not be created or does not exist
    CollectionUnavailable,
    /// The store could not be reached or returned an unexpected response
    TransportFailure,
    /// The state could not be converted to or from a document
    Serialization,
    /// The adapter configuration is invalid
    Configuration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::DuplicateKey => write!(f, "duplicate key"),
            FailureKind::ConcurrencyConflict => write!(f, "concurrency conflict"),
            FailureKind::CollectionUnavailable => write!(f, "collection unavailable"),
            FailureKind::TransportFailure => write!(f, "transport failure"),
            FailureKind::Serialization => write!(f, "serialization"),
            FailureKind::Configuration => write!(f, "configuration"),
        }
    }
}

/// The adapter operation which failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Read,
    Write,
    Clear,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Init => write!(f, "init"),
            Operation::Read => write!(f, "read state"),
            Operation::Write => write!(f, "write state"),
            Operation::Clear => write!(f, "clear state"),
        }
    }
}

/// The single failure type reported to the runtime.
///
/// `message` carries the diagnostic text of the underlying error. The adapter
/// never retries; the caller decides whether to reload, overwrite or give up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct StorageFailure {
    kind: FailureKind,
    operation: Operation,
    message: String,
}

impl StorageFailure {
    pub fn new<M: Into<String>>(kind: FailureKind, operation: Operation, message: M) -> Self {
        Self {
            kind,
            operation,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == FailureKind::ConcurrencyConflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_operation_kind_and_message() {
        let failure = StorageFailure::new(
            FailureKind::ConcurrencyConflict,
            Operation::Write,
            "revision _a does not match _b",
        );
        assert_eq!(
            failure.to_string(),
            "write state failed (concurrency conflict): revision _a does not match _b"
        );
        assert!(failure.is_conflict());
    }
}
