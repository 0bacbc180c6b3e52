use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::store::{EntityKind, VersionToken};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccrualError {
    #[error("missing input: {field} has not been populated")]
    MissingInput {
        field: &'static str,
    },

    #[error("{kind} not found: {key}")]
    ReferenceNotFound {
        kind: EntityKind,
        key: String,
    },

    #[error("invariant violation: {message}")]
    InvariantViolation {
        message: String,
    },

    #[error("concurrent modification of {kind} {key}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        kind: EntityKind,
        key: String,
        expected: VersionToken,
        actual: VersionToken,
    },

    #[error("persistence failure: {message}")]
    PersistenceFailure {
        message: String,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },
}

/// stable classification of an [`AccrualError`], stored with the failed accrual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MissingInput,
    ReferenceNotFound,
    InvariantViolation,
    ConcurrentModification,
    PersistenceFailure,
    InvalidState,
    InvalidConfiguration,
    InvalidDate,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MissingInput => "MISSING_INPUT",
            ErrorKind::ReferenceNotFound => "REFERENCE_NOT_FOUND",
            ErrorKind::InvariantViolation => "INVARIANT_VIOLATION",
            ErrorKind::ConcurrentModification => "CONCURRENT_MODIFICATION",
            ErrorKind::PersistenceFailure => "PERSISTENCE_FAILURE",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorKind::InvalidDate => "INVALID_DATE",
        };
        f.write_str(name)
    }
}

impl AccrualError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccrualError::MissingInput { .. } => ErrorKind::MissingInput,
            AccrualError::ReferenceNotFound { .. } => ErrorKind::ReferenceNotFound,
            AccrualError::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            AccrualError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            AccrualError::PersistenceFailure { .. } => ErrorKind::PersistenceFailure,
            AccrualError::InvalidState { .. } => ErrorKind::InvalidState,
            AccrualError::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            AccrualError::InvalidDate { .. } => ErrorKind::InvalidDate,
        }
    }

    /// whether the driver may retry the stage (after re-reading, for conflicts)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AccrualError::ConcurrentModification { .. } | AccrualError::PersistenceFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AccrualError>;
