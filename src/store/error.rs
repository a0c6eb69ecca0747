use thiserror::Error;

/// Failures surfaced by the store layer. Callers can tell a rejected input
/// apart from a database fault; "not found" is not an error and comes back as
/// `Ok(None)`, `Ok(false)` or an empty vec depending on the operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("database failure: {0}")]
    Io(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
