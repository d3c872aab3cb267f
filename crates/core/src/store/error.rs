//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness constraint was violated by a concurrent writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A row expected to exist is missing.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Database(_) => 500,
            Self::Conflict(_) => 409,
            Self::NotFound(_) => 404,
        }
    }

    /// Returns true if the operation may succeed when retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        assert!(StoreError::Conflict("dup".into()).is_retryable());
        assert!(!StoreError::Database("down".into()).is_retryable());
        assert!(!StoreError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::Conflict(String::new()).http_status_code(), 409);
        assert_eq!(StoreError::NotFound(String::new()).http_status_code(), 404);
        assert_eq!(StoreError::Database(String::new()).error_code(), "DATABASE_ERROR");
    }
}
