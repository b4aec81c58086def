/// A malformed schema or attribute specification.
///
/// Raised only while schemas are being built (startup or command
/// registration). It never reaches a request: a process that fails to build
/// its schemas must not start serving.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Schema configuration error: {0}")]
pub struct SchemaError(pub String);

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A single attribute failed a single check.
///
/// `status_hint` lets the transport layer tell "does not exist" (404)
/// apart from a generic shape error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub message: String,
    pub status_hint: Option<u16>,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_hint: None,
        }
    }

    /// A failure caused by a reference to something that does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_hint: Some(404),
        }
    }
}

/// Failures reported by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The natural-key uniqueness constraint rejected an insert.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by validation and import.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// An idempotent import found a divergent entity under the same natural key.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any persistence failure other than the handled uniqueness race.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_failure_carries_status_hint() {
        let failure = ValidationFailure::not_found("attribute repo must refer to an existing instance");
        assert_eq!(failure.status_hint, Some(404));
        assert_eq!(
            failure.to_string(),
            "attribute repo must refer to an existing instance"
        );
    }

    #[test]
    fn plain_failure_has_no_hint() {
        assert_eq!(ValidationFailure::new("nope").status_hint, None);
    }

    #[test]
    fn validation_failure_is_a_std_error_source() {
        let err: CoreError = ValidationFailure::new("attribute name is required").into();
        assert_eq!(err.to_string(), "Validation failed: attribute name is required");
        let source = std::error::Error::source(&err).expect("wrapped failure");
        assert_eq!(source.to_string(), "attribute name is required");
    }

    #[test]
    fn core_error_wraps_store_error() {
        let err: CoreError = StoreError::Backend("connection reset".into()).into();
        assert_eq!(err.to_string(), "Storage error: backend error: connection reset");
    }
}
