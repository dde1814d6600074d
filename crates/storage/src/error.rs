use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("username already exists: {0}")]
    UsernameTaken(String),

    #[error("core error: {0}")]
    Core(#[from] calctree_core::CoreError),
}
