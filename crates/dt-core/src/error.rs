//! Errors raised by the timing engine.
//!
//! Every variant signals a programming or data-consistency problem, not a
//! user input mistake. None of them are retried internally.

use thiserror::Error;

use crate::types::ValidationError;

/// Timer and time-line errors.
#[derive(Debug, Error)]
pub enum TimerError {
    /// Malformed argument or corrupt persisted payload.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A range has an odd number of points at compute time.
    #[error("incomplete range: {0}")]
    IncompleteRange(String),

    /// Two starts or two ends follow each other in a repaired range.
    #[error("malformed range: {0}")]
    MalformedRange(String),

    /// Mixed targets, non-monotonic timestamps, or a range in the wrong state.
    #[error("inconsistent range: {0}")]
    InconsistentRange(String),

    /// A duration query spans more than one target clock.
    #[error("inconsistent criteria: {0}")]
    InconsistentCriteria(String),

    /// Persistence was requested on a timer without storage.
    #[error("invalid storage: {0}")]
    InvalidStorage(String),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ValidationError> for TimerError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidData(err.to_string())
    }
}

/// Failures reported by a [`TimeStorage`](crate::TimeStorage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not complete the operation.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps any backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_become_invalid_data() {
        let err: TimerError = ValidationError::InvalidTimestamp { value: -1.0 }.into();
        assert!(matches!(err, TimerError::InvalidData(_)));
        assert_eq!(
            err.to_string(),
            "invalid data: timestamp must be a finite, non-negative number of seconds, got -1"
        );
    }

    #[test]
    fn storage_errors_are_transparent() {
        let io = std::io::Error::other("disk full");
        let err: TimerError = StorageError::backend(io).into();
        assert_eq!(err.to_string(), "storage backend error: disk full");
    }
}
