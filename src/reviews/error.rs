use thiserror::Error;

/// Failure kinds of the review lifecycle. Every variant is scoped to a single request.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{field}: {message}")]
    InvalidArgument { field: &'static str, message: String },

    /// Connection loss, pool exhaustion, timeouts, serialization failures. Safe to retry.
    #[error("Transient storage failure: {0}")]
    TransientStorageFailure(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReviewError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ReviewError::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::TransientStorageFailure(_))
    }
}

// Postgres SQLSTATE codes that matter to the review store
const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for ReviewError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => ReviewError::TransientStorageFailure(err.to_string()),
            sqlx::Error::Database(ref db) => match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    ReviewError::Conflict("You have already reviewed this developer".to_string())
                }
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(QUERY_CANCELED) => {
                    ReviewError::TransientStorageFailure(db.message().to_string())
                }
                _ => ReviewError::Storage(err.to_string()),
            },
            other => ReviewError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeouts_are_retryable() {
        let err: ReviewError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_rows_are_not_retryable() {
        let err: ReviewError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ReviewError::Storage(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn invalid_argument_names_the_field() {
        let err = ReviewError::invalid("rating", "Rating must be between 1 and 5");
        assert_eq!(err.to_string(), "rating: Rating must be between 1 and 5");
    }
}
