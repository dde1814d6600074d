use calctree_core::{CalculationId, CoreError};
use calctree_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("parent calculation not found: {0}")]
    ParentNotFound(CalculationId),

    #[error("user not found: {0}")]
    UserNotFound(String),
}

/// Coarse failure classes for callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidOperation,
    DivisionByZero,
    ParentNotFound,
    CorruptTree,
    InvalidInput,
    NotFound,
    Store,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) | Self::Storage(StorageError::Core(e)) => match e {
                CoreError::InvalidOperation(_) => ErrorKind::InvalidOperation,
                CoreError::DivisionByZero => ErrorKind::DivisionByZero,
                CoreError::InvalidNumber(_) => ErrorKind::InvalidInput,
                CoreError::CorruptTree { .. } => ErrorKind::CorruptTree,
            },
            Self::ParentNotFound(_) => ErrorKind::ParentNotFound,
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::Storage(StorageError::UsernameTaken(_))
            | Self::Storage(StorageError::ConstraintViolation(_)) => ErrorKind::InvalidInput,
            Self::Storage(_) => ErrorKind::Store,
        }
    }
}
